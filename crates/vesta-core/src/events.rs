//! Notifications emitted by engine entry points.
//!
//! Every committed call returns the events it produced, in order. Failed
//! calls emit nothing.

use serde::{Deserialize, Serialize};

use crate::types::AccountId;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VestingEvent {
    /// Ledger movement between two accounts.
    Transfer { from: AccountId, to: AccountId, amount: u64 },
    /// Value entering the ledger with no sender.
    Deposit { to: AccountId, amount: u64 },
    /// Unvested shortfall routed into the pool.
    Forfeited { account: AccountId, amount: u64, pool: u64 },
    /// A new record was appended.
    RecordCreated { account: AccountId, slot: usize, principal: u64, vest_complete: u64 },
    /// Value folded into an existing record.
    RecordMerged { account: AccountId, slot: usize, amount: u64, forced: bool },
    /// A record crossed its `vest_complete` on touch.
    FullyVested { account: AccountId, slot: usize },
    /// Exhausted records removed by cleanup.
    RecordsCleaned { account: AccountId, removed: usize },
    /// Pool share paid out.
    PoolClaimed { account: AccountId, amount: u64, pool: u64 },
    /// Merkle-path payout.
    MerkleClaimed { index: u64, account: AccountId, amount: u64 },
}

impl VestingEvent {
    /// The account the event is primarily about.
    pub fn account(&self) -> AccountId {
        match self {
            Self::Transfer { from, .. } => *from,
            Self::Deposit { to, .. } => *to,
            Self::Forfeited { account, .. }
            | Self::RecordCreated { account, .. }
            | Self::RecordMerged { account, .. }
            | Self::FullyVested { account, .. }
            | Self::RecordsCleaned { account, .. }
            | Self::PoolClaimed { account, .. }
            | Self::MerkleClaimed { account, .. } => *account,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_tagged() {
        let e = VestingEvent::Forfeited {
            account: AccountId([1; 32]),
            amount: 250,
            pool: 250,
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"kind\":\"forfeited\""));
        let back: VestingEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn transfer_is_about_sender() {
        let e = VestingEvent::Transfer {
            from: AccountId([1; 32]),
            to: AccountId([2; 32]),
            amount: 1,
        };
        assert_eq!(e.account(), AccountId([1; 32]));
    }
}
