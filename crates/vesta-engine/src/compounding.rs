//! Compounding ledger: multiplier accrual and the global weight aggregate.
//!
//! Growth is additive within one accrual step:
//! `growth = 1 + days * (rate - 1)`, applied once per call. The global
//! `total_weighted_contribution` only ever moves by the difference between
//! an account's old and new cached weight.

use tracing::debug;

use vesta_core::constants::{DAY, PRECISION};
use vesta_core::error::VestingError;
use vesta_core::events::VestingEvent;
use vesta_core::types::{AccountId, AccountVesting, GlobalState, VestingRecord};

use crate::config::EngineConfig;
use crate::math::{fixed_mul, swap_contribution};
use crate::vesting::touch;

/// Advance a fully-vested record's multiplier by the whole days elapsed.
///
/// Days are capped at `max_accrual_days`; the sub-day remainder (and any
/// capped-off days) carry over to the next call. Returns `true` if the
/// multiplier moved.
pub fn accrue(
    record: &mut VestingRecord,
    now: u64,
    config: &EngineConfig,
) -> Result<bool, VestingError> {
    if !record.fully_vested {
        return Ok(false);
    }
    let days = (now.saturating_sub(record.last_accrual) / DAY).min(config.max_accrual_days);
    if days == 0 {
        return Ok(false);
    }

    let step = config
        .daily_rate
        .checked_sub(PRECISION)
        .ok_or(VestingError::ArithmeticOverflow)?;
    let growth = (days as u128)
        .checked_mul(step)
        .and_then(|g| g.checked_add(PRECISION))
        .ok_or(VestingError::ArithmeticOverflow)?;

    record.multiplier = fixed_mul(record.multiplier, growth)?;
    record.last_accrual = days
        .checked_mul(DAY)
        .and_then(|d| record.last_accrual.checked_add(d))
        .ok_or(VestingError::ArithmeticOverflow)?;
    Ok(true)
}

/// Recompute an account's weight and mirror the delta into the global total.
pub fn sync_weight(acct: &mut AccountVesting, globals: &mut GlobalState) -> Result<(), VestingError> {
    let mut weight: u128 = 0;
    for record in &acct.records {
        weight = weight
            .checked_add(record.weighted()?)
            .ok_or(VestingError::ArithmeticOverflow)?;
    }
    globals.total_weighted_contribution = swap_contribution(
        globals.total_weighted_contribution,
        acct.weighted_contribution,
        weight,
    )?;
    acct.weighted_contribution = weight;
    Ok(())
}

/// Lazy refresh: full-vest transitions, accrual, then a weight sync.
pub fn refresh_account(
    account: &AccountId,
    acct: &mut AccountVesting,
    globals: &mut GlobalState,
    now: u64,
    config: &EngineConfig,
    events: &mut Vec<VestingEvent>,
) -> Result<(), VestingError> {
    for (slot, record) in acct.records.iter_mut().enumerate() {
        if touch(record, now) {
            debug!(%account, slot, principal = record.principal, "record fully vested");
            events.push(VestingEvent::FullyVested {
                account: *account,
                slot,
            });
        }
        accrue(record, now, config)?;
    }
    sync_weight(acct, globals)
}
