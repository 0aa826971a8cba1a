//! Record store: creation, opportunistic and forced merging, cleanup.
//!
//! An account holds at most `max_records` records. Deposits fold into a
//! young record when one is inside the merge window, open a new slot
//! otherwise, and are force-merged once every slot is taken. Records are
//! removed by swap-and-truncate, so slot order is not meaningful.

use tracing::debug;

use vesta_core::constants::LOCKED_DIVISOR;
use vesta_core::error::VestingError;
use vesta_core::events::VestingEvent;
use vesta_core::types::{AccountId, AccountVesting, GlobalState, VestingRecord};

use crate::compounding::sync_weight;
use crate::config::EngineConfig;
use crate::distributor::fair_share;
use crate::math::{add, mul_div, to_u64};

/// Where a deposit ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// A fresh record was appended at this slot.
    Created(usize),
    /// Folded into a record inside the merge window.
    Merged(usize),
    /// Capacity reached; folded into this slot by the forced-merge rule.
    Forced(usize),
}

impl Placement {
    pub fn slot(&self) -> usize {
        match *self {
            Self::Created(s) | Self::Merged(s) | Self::Forced(s) => s,
        }
    }
}

/// Add `amount` to a record the way every merge does: full principal,
/// half of it locked, deposit clock reset.
fn fold(record: &mut VestingRecord, amount: u64, now: u64) -> Result<(), VestingError> {
    record.principal = add(record.principal, amount)?;
    record.locked = add(record.locked, amount / LOCKED_DIVISOR)?;
    record.last_deposit_time = now;
    Ok(())
}

/// Run cleanup, then merge `amount` into a young record, append a new one,
/// or force-merge when full.
///
/// The account must already be refreshed for `now`.
pub fn create_or_merge(
    account: &AccountId,
    acct: &mut AccountVesting,
    globals: &mut GlobalState,
    amount: u64,
    now: u64,
    config: &EngineConfig,
    events: &mut Vec<VestingEvent>,
) -> Result<Placement, VestingError> {
    cleanup(account, acct, globals, events)?;

    let mergeable = acct.slots_by_age().into_iter().find(|&slot| {
        let r = &acct.records[slot];
        !r.fully_vested && now.saturating_sub(r.last_deposit_time) <= config.merge_window
    });

    if let Some(slot) = mergeable {
        fold(&mut acct.records[slot], amount, now)?;
        debug!(%account, slot, amount, "deposit merged");
        events.push(VestingEvent::RecordMerged {
            account: *account,
            slot,
            amount,
            forced: false,
        });
        return Ok(Placement::Merged(slot));
    }

    if acct.records.len() < config.max_records {
        let record = VestingRecord::open(amount, now, config.vesting_duration)?;
        let slot = acct.records.len();
        events.push(VestingEvent::RecordCreated {
            account: *account,
            slot,
            principal: record.principal,
            vest_complete: record.vest_complete,
        });
        debug!(%account, slot, amount, vest_complete = record.vest_complete, "record created");
        acct.records.push(record);
        return Ok(Placement::Created(slot));
    }

    force_merge(account, acct, globals, amount, now, config, events)
}

/// Fold `amount` into an existing record when the account is at capacity.
///
/// Prefers the oldest record still vesting and pushes its maturity out to
/// `now + (remaining * amount + duration * old_principal) / (amount + old_principal)`.
/// If every record is fully vested, the newest one takes the amount as
/// principal only: multiplier and accrual clock stay as they are, so the
/// added principal is weighted at the already-accrued multiplier.
pub fn force_merge(
    account: &AccountId,
    acct: &mut AccountVesting,
    globals: &mut GlobalState,
    amount: u64,
    now: u64,
    config: &EngineConfig,
    events: &mut Vec<VestingEvent>,
) -> Result<Placement, VestingError> {
    let by_age = acct.slots_by_age();
    if by_age.is_empty() {
        return Err(VestingError::CapacityExhausted);
    }

    let vesting = by_age
        .iter()
        .copied()
        .find(|&slot| !acct.records[slot].fully_vested);

    let slot = match vesting {
        Some(slot) => {
            let record = &mut acct.records[slot];
            let remaining = record.vest_complete.saturating_sub(now) as u128;
            let old_principal = record.principal as u128;
            let numerator = remaining
                .checked_mul(amount as u128)
                .and_then(|a| {
                    (config.vesting_duration as u128)
                        .checked_mul(old_principal)
                        .and_then(|b| a.checked_add(b))
                })
                .ok_or(VestingError::ArithmeticOverflow)?;
            let new_remaining = to_u64(mul_div(numerator, 1, old_principal + amount as u128)?)?;
            record.vest_complete = add(now, new_remaining)?;
            fold(record, amount, now)?;
            debug!(%account, slot, amount, vest_complete = record.vest_complete, "forced merge into vesting record");
            slot
        }
        None => {
            // Newest by age: largest vest_start, ties by slot.
            let slot = by_age[by_age.len() - 1];
            let record = &mut acct.records[slot];
            record.principal = add(record.principal, amount)?;
            sync_weight(acct, globals)?;
            debug!(%account, slot, amount, "forced merge into vested record");
            slot
        }
    };

    events.push(VestingEvent::RecordMerged {
        account: *account,
        slot,
        amount,
        forced: true,
    });
    Ok(Placement::Forced(slot))
}

/// Remove every fully-vested record whose claimed share has reached its
/// fair share under the current aggregates. Returns the number removed.
pub fn cleanup(
    account: &AccountId,
    acct: &mut AccountVesting,
    globals: &mut GlobalState,
    events: &mut Vec<VestingEvent>,
) -> Result<usize, VestingError> {
    let snapshot = *globals;
    let before = acct.records.len();
    let mut i = 0;
    while i < acct.records.len() {
        let record = &acct.records[i];
        if record.fully_vested && record.claimed_share >= fair_share(record, &snapshot)? {
            acct.records.swap_remove(i);
        } else {
            i += 1;
        }
    }

    let removed = before - acct.records.len();
    if removed > 0 {
        sync_weight(acct, globals)?;
        debug!(%account, removed, remaining = acct.records.len(), "records cleaned up");
        events.push(VestingEvent::RecordsCleaned {
            account: *account,
            removed,
        });
    }
    Ok(removed)
}
