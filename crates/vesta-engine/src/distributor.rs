//! Claim distributor: pro-rata shares of the forfeited pool.
//!
//! A record's fair share is `weighted * pool / total_weight`, evaluated
//! against whatever the aggregates hold at the moment of the call.

use vesta_core::error::VestingError;
use vesta_core::types::{AccountVesting, GlobalState, VestingRecord};

use crate::math::{mul_div, to_u64};

/// Current fair share of the pool attributable to `record`.
///
/// Zero while no weight is registered anywhere.
pub fn fair_share(record: &VestingRecord, globals: &GlobalState) -> Result<u64, VestingError> {
    if globals.total_weighted_contribution == 0 || !record.fully_vested {
        return Ok(0);
    }
    to_u64(mul_div(
        record.weighted()?,
        globals.forfeited_pool as u128,
        globals.total_weighted_contribution,
    )?)
}

/// Headroom left on a record: `max(0, fair_share - claimed_share)`.
pub fn outstanding(record: &VestingRecord, globals: &GlobalState) -> Result<u64, VestingError> {
    Ok(fair_share(record, globals)?.saturating_sub(record.claimed_share))
}

/// Sum of outstanding shares across an account's fully-vested records.
pub fn claimable(acct: &AccountVesting, globals: &GlobalState) -> Result<u64, VestingError> {
    let mut total: u64 = 0;
    for record in acct.records.iter().filter(|r| r.fully_vested) {
        total = total
            .checked_add(outstanding(record, globals)?)
            .ok_or(VestingError::ArithmeticOverflow)?;
    }
    Ok(total)
}

/// Attribute `amount` to the account's fully-vested records.
///
/// Each record first receives its weight-proportional part of `amount`,
/// capped at its outstanding share; the rounding remainder then fills
/// records with headroom in slot order. `globals` must be the pre-payout
/// aggregates so that no record ends above its fair share.
pub fn distribute(
    acct: &mut AccountVesting,
    globals: &GlobalState,
    amount: u64,
) -> Result<(), VestingError> {
    let mut headroom = Vec::with_capacity(acct.records.len());
    let mut account_weight: u128 = 0;
    for record in &acct.records {
        headroom.push(outstanding(record, globals)?);
        account_weight = account_weight
            .checked_add(record.weighted()?)
            .ok_or(VestingError::ArithmeticOverflow)?;
    }
    if account_weight == 0 {
        return if amount == 0 {
            Ok(())
        } else {
            Err(VestingError::NothingToClaim)
        };
    }

    let mut remaining = amount;
    for (record, room) in acct.records.iter_mut().zip(headroom.iter_mut()) {
        let proportional = to_u64(mul_div(
            amount as u128,
            record.weighted()?,
            account_weight,
        )?)?;
        let part = proportional.min(*room).min(remaining);
        record.claimed_share = record
            .claimed_share
            .checked_add(part)
            .ok_or(VestingError::ArithmeticOverflow)?;
        *room -= part;
        remaining -= part;
    }

    for (record, room) in acct.records.iter_mut().zip(headroom.iter()) {
        if remaining == 0 {
            break;
        }
        let part = (*room).min(remaining);
        record.claimed_share = record
            .claimed_share
            .checked_add(part)
            .ok_or(VestingError::ArithmeticOverflow)?;
        remaining -= part;
    }

    // Only reachable if `amount` exceeded `claimable`.
    if remaining > 0 {
        return Err(VestingError::ArithmeticOverflow);
    }
    Ok(())
}
