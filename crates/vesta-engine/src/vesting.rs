//! Vesting calculator: vested amounts and the lazy full-vest transition.
//!
//! Half of every deposit is vested on arrival; the locked half vests
//! linearly over the configured duration. All divisions truncate, so
//! rounding never favours the account.

use vesta_core::constants::{LOCKED_DIVISOR, PRECISION};
use vesta_core::error::VestingError;
use vesta_core::types::{AccountVesting, VestingRecord};

use crate::math::{mul_div, to_u64};

/// Vested portion of a single record at `now`.
///
/// `principal / 2 + locked * min(now - vest_start, duration) / duration`,
/// or the whole principal once the record is (or would be, on its next
/// touch) fully vested.
pub fn vested_amount(
    record: &VestingRecord,
    now: u64,
    duration: u64,
) -> Result<u64, VestingError> {
    if record.fully_vested || now >= record.vest_complete {
        return Ok(record.principal);
    }
    let elapsed = now.saturating_sub(record.vest_start).min(duration);
    let linear = to_u64(mul_div(record.locked as u128, elapsed as u128, duration as u128)?)?;
    (record.principal / LOCKED_DIVISOR)
        .checked_add(linear)
        .ok_or(VestingError::ArithmeticOverflow)
}

/// Not-yet-vested part of a single record: `principal - vested_amount`.
pub fn unvested_amount(
    record: &VestingRecord,
    now: u64,
    duration: u64,
) -> Result<u64, VestingError> {
    Ok(record
        .principal
        .saturating_sub(vested_amount(record, now, duration)?))
}

/// What `account` may move at `now` without forfeiting.
///
/// Only value still vesting inside a record is held back; anything the
/// records do not account for (pool and Merkle payouts, value whose
/// record was cleaned up) is free. Clamped to `[0, balance]`.
pub fn account_vested(
    acct: &AccountVesting,
    balance: u64,
    now: u64,
    duration: u64,
) -> Result<u64, VestingError> {
    let mut unvested: u64 = 0;
    for record in &acct.records {
        unvested = unvested
            .checked_add(unvested_amount(record, now, duration)?)
            .ok_or(VestingError::ArithmeticOverflow)?;
    }
    Ok(balance.saturating_sub(unvested))
}

/// Flip `fully_vested` if `now` has reached `vest_complete`.
///
/// Returns `true` only on the transition. The caller must re-sync the
/// account's weight afterwards.
pub fn touch(record: &mut VestingRecord, now: u64) -> bool {
    if record.fully_vested || now < record.vest_complete {
        return false;
    }
    record.fully_vested = true;
    record.multiplier = PRECISION;
    record.last_accrual = now;
    record.locked = 0;
    true
}
