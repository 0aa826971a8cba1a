//! Forfeiture router: every value movement between participants.
//!
//! The sender's records are refreshed and its vested balance computed;
//! whatever the movement asks for beyond that is forfeited into the pool
//! and deducted from the sender's locked value, oldest record first. The
//! receiver then gets a record for what was actually delivered.

use tracing::{debug, info};

use vesta_core::error::VestingError;
use vesta_core::events::VestingEvent;
use vesta_core::traits::VestingStore;
use vesta_core::types::{AccountId, AccountVesting};

use crate::compounding::refresh_account;
use crate::config::EngineConfig;
use crate::journal::Journal;
use crate::math::add;
use crate::records::create_or_merge;
use crate::vesting::account_vested;

/// Result of a routed movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveOutcome {
    pub delivered: u64,
    pub forfeited: u64,
}

/// Deduct up to `shortfall` from locked value, oldest record first.
///
/// Both `locked` and `principal` drop by the deducted amount. Returns what
/// was actually deducted, which is less than `shortfall` when the account's
/// locked value runs out first.
pub fn deduct_fifo(acct: &mut AccountVesting, shortfall: u64) -> u64 {
    let mut remaining = shortfall;
    for slot in acct.slots_by_age() {
        if remaining == 0 {
            break;
        }
        let record = &mut acct.records[slot];
        let take = record.locked.min(remaining);
        record.locked -= take;
        record.principal -= take;
        remaining -= take;
    }
    shortfall - remaining
}

/// Stage a movement of `amount` from `from` to `to` into `journal`.
///
/// Exempt senders skip the forfeiture check, exempt receivers never get a
/// record, and a movement between two exempt accounts is a plain transfer.
/// Fails with `InsufficientBalance` before staging anything if `from`
/// cannot cover `amount`.
pub fn route<S: VestingStore + ?Sized>(
    journal: &mut Journal<'_, S>,
    config: &EngineConfig,
    from: &AccountId,
    to: &AccountId,
    amount: u64,
    now: u64,
) -> Result<MoveOutcome, VestingError> {
    let have = journal.balance(from)?;
    if have < amount {
        return Err(VestingError::InsufficientBalance { have, need: amount });
    }

    let from_exempt = journal.is_exempt(from)?;
    let to_exempt = journal.is_exempt(to)?;

    if from_exempt && to_exempt {
        journal.transfer(from, to, amount)?;
        return Ok(MoveOutcome {
            delivered: amount,
            forfeited: 0,
        });
    }

    let mut forfeited = 0;
    if !from_exempt {
        let mut acct = journal.account(from)?;
        let mut globals = journal.globals()?;
        refresh_account(from, &mut acct, &mut globals, now, config, journal.events_mut())?;

        let vested = account_vested(&acct, have, now, config.vesting_duration)?;
        let shortfall = amount.saturating_sub(vested);
        if shortfall > 0 {
            let deducted = deduct_fifo(&mut acct, shortfall);
            globals.forfeited_pool = add(globals.forfeited_pool, shortfall)?;
            journal.transfer(from, &AccountId::FORFEIT_POOL, shortfall)?;
            info!(
                account = %from,
                shortfall,
                deducted,
                vested,
                pool = globals.forfeited_pool,
                "unvested value forfeited"
            );
            journal.emit(VestingEvent::Forfeited {
                account: *from,
                amount: shortfall,
                pool: globals.forfeited_pool,
            });
            forfeited = shortfall;
        }
        journal.put_account(*from, acct);
        journal.put_globals(globals);
    }

    let delivered = amount - forfeited;
    if delivered > 0 {
        journal.transfer(from, to, delivered)?;
        if !to_exempt {
            let mut acct = journal.account(to)?;
            let mut globals = journal.globals()?;
            refresh_account(to, &mut acct, &mut globals, now, config, journal.events_mut())?;
            create_or_merge(to, &mut acct, &mut globals, delivered, now, config, journal.events_mut())?;
            journal.put_account(*to, acct);
            journal.put_globals(globals);
        }
    }

    debug!(%from, %to, amount, delivered, forfeited, "movement routed");
    Ok(MoveOutcome {
        delivered,
        forfeited,
    })
}
