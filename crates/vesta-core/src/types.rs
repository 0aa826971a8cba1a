//! Core domain types: accounts, vesting records, global aggregates.
//!
//! Amounts are `u64` base units. Multipliers and aggregate weights are
//! `u128` fixed-point values scaled by [`PRECISION`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{LOCKED_DIVISOR, PRECISION};
use crate::error::VestingError;

/// A 32-byte hash value (Merkle leaves, nodes and roots).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The zero hash. A zero Merkle root means "no root published".
    pub const ZERO: Self = Self([0u8; 32]);

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero hash.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Hash256 {
    type Err = VestingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_32(s).map(Self)
    }
}

/// A 32-byte account identifier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// The zero account. Never a valid participant.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Engine-held account backing `forfeited_pool` in the balance ledger.
    pub const FORFEIT_POOL: Self = Self([0xFF; 32]);

    /// Engine-held account paying out Merkle-path claims.
    pub const DISTRIBUTION_RESERVE: Self = Self([0xFE; 32]);

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether the account may appear as a sender or receiver.
    pub fn is_participant(&self) -> bool {
        *self != Self::ZERO && *self != Self::FORFEIT_POOL && *self != Self::DISTRIBUTION_RESERVE
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl FromStr for AccountId {
    type Err = VestingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_32(s).map(Self)
    }
}

/// JSON and other human-readable formats carry both id types as hex strings.
macro_rules! hex_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_serde!(Hash256);
hex_serde!(AccountId);

fn parse_32(s: &str) -> Result<[u8; 32], VestingError> {
    let bytes = hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| VestingError::InvalidAccount(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| VestingError::InvalidAccount(format!("expected 32 bytes, got {}", b.len())))
}

/// A single locked-value entry with its own vesting window and compounding state.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct VestingRecord {
    /// Total value created/merged into this record, net of forfeiture.
    pub principal: u64,
    /// Portion still subject to linear vesting. Always `<= principal`.
    pub locked: u64,
    /// Start of the linear vesting window.
    pub vest_start: u64,
    /// Full-vest timestamp. Only a forced merge moves it.
    pub vest_complete: u64,
    /// One-way flag, set on the first touch at or after `vest_complete`.
    pub fully_vested: bool,
    /// Growth multiplier (`PRECISION` = 1.0). Zero until fully vested.
    pub multiplier: u128,
    /// Last compounding step. Advances in whole days.
    pub last_accrual: u64,
    /// Cumulative pool payout attributed to this record.
    pub claimed_share: u64,
    /// Most recent deposit folded into this record.
    pub last_deposit_time: u64,
}

impl VestingRecord {
    /// Open a fresh record for `amount` received at `now`.
    pub fn open(amount: u64, now: u64, duration: u64) -> Result<Self, VestingError> {
        let vest_complete = now
            .checked_add(duration)
            .ok_or(VestingError::ArithmeticOverflow)?;
        Ok(Self {
            principal: amount,
            locked: amount / LOCKED_DIVISOR,
            vest_start: now,
            vest_complete,
            fully_vested: false,
            multiplier: 0,
            last_accrual: now,
            claimed_share: 0,
            last_deposit_time: now,
        })
    }

    /// Weighted contribution: `principal * multiplier / PRECISION`.
    ///
    /// Zero for records that have not yet fully vested.
    pub fn weighted(&self) -> Result<u128, VestingError> {
        if !self.fully_vested {
            return Ok(0);
        }
        (self.principal as u128)
            .checked_mul(self.multiplier)
            .map(|v| v / PRECISION)
            .ok_or(VestingError::ArithmeticOverflow)
    }
}

/// An account's bounded record collection plus its cached weight.
///
/// Records are addressed by slot index. Removal is swap-and-truncate, so
/// slot order carries no meaning; age order comes from `vest_start`.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct AccountVesting {
    pub records: Vec<VestingRecord>,
    /// Sum of `weighted()` over this account's records, mirrored into
    /// [`GlobalState::total_weighted_contribution`].
    pub weighted_contribution: u128,
}

impl AccountVesting {
    /// No records and no cached weight: nothing worth persisting.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.weighted_contribution == 0
    }

    /// Slot indices ordered oldest first (by `vest_start`, ties by slot).
    pub fn slots_by_age(&self) -> Vec<usize> {
        let mut slots: Vec<usize> = (0..self.records.len()).collect();
        slots.sort_by_key(|&i| (self.records[i].vest_start, i));
        slots
    }
}

/// Global aggregates shared by every account.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct GlobalState {
    /// Everything ever forfeited minus everything ever claimed.
    pub forfeited_pool: u64,
    /// Sum of every account's cached `weighted_contribution`.
    pub total_weighted_contribution: u128,
}
