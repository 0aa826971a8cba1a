//! Property-based bookkeeping tests.
//!
//! Random sequences of deposits, movements, claims, touches and clock
//! advances are replayed against a fresh engine. After every step the
//! following must hold:
//!
//! - no account holds more records than the configured capacity
//! - every record keeps `locked <= principal`
//! - the vested balance never exceeds the held balance
//! - the pool equals everything forfeited minus everything claimed
//! - cached weights match a brute-force recomputation (via `audit`)
//!
//! Once every record has matured, whole balances move without forfeiture.

use proptest::prelude::*;
use vesta_core::constants::*;
use vesta_core::error::VestingError;
use vesta_core::store::MemoryStore;
use vesta_core::types::AccountId;
use vesta_engine::{EngineConfig, VestingEngine};
use vesta_tests::helpers::*;

const ACCOUNTS: u8 = 5;

#[derive(Clone, Debug)]
enum Op {
    Deposit { to: u8, amount: u64 },
    /// Move `percent` of the sender's current balance.
    Move { from: u8, to: u8, percent: u64 },
    Claim { who: u8 },
    Touch { who: u8 },
    Advance { secs: u64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let who = 1..=ACCOUNTS;
    prop_oneof![
        4 => (who.clone(), 1u64..1_000_000_000).prop_map(|(to, amount)| Op::Deposit { to, amount }),
        3 => (who.clone(), who.clone(), 1u64..=100)
            .prop_map(|(from, to, percent)| Op::Move { from, to, percent }),
        2 => who.clone().prop_map(|who| Op::Claim { who }),
        1 => who.prop_map(|who| Op::Touch { who }),
        3 => (0u64..6 * DAY).prop_map(|secs| Op::Advance { secs }),
    ]
}

/// Running totals the pool is checked against.
#[derive(Default)]
struct Tally {
    forfeited: u64,
    claimed: u64,
}

fn apply(
    engine: &mut VestingEngine<MemoryStore>,
    op: &Op,
    now: &mut u64,
    tally: &mut Tally,
) -> Result<(), VestingError> {
    match *op {
        Op::Deposit { to, amount } => {
            engine.deposit(&id(to), amount, *now)?;
        }
        Op::Move { from, to, percent } => {
            let have = engine.balance_of(&id(from))?;
            let amount = have * percent / 100;
            let receipt = engine.move_funds(&id(from), &id(to), amount, *now)?;
            assert_eq!(receipt.amount + receipt.forfeited, amount);
            tally.forfeited += receipt.forfeited;
        }
        Op::Claim { who } => match engine.claim(&id(who), *now) {
            Ok(receipt) => tally.claimed += receipt.amount,
            Err(VestingError::NothingToClaim) => {}
            Err(e) => return Err(e),
        },
        Op::Touch { who } => {
            engine.touch_account(&id(who), *now)?;
        }
        Op::Advance { secs } => *now += secs,
    }
    Ok(())
}

fn check_invariants(
    engine: &VestingEngine<MemoryStore>,
    now: u64,
    tally: &Tally,
) -> Result<(), TestCaseError> {
    for seed in 1..=ACCOUNTS {
        let who = id(seed);
        let records = engine.records(&who).unwrap();
        prop_assert!(records.len() <= MAX_RECORDS, "{} records", records.len());
        for r in &records {
            prop_assert!(r.locked <= r.principal, "locked {} > principal {}", r.locked, r.principal);
            if r.fully_vested {
                prop_assert_eq!(r.locked, 0);
                prop_assert!(r.multiplier >= PRECISION);
            }
        }
        let balance = engine.balance_of(&who).unwrap();
        prop_assert!(engine.vested_balance(&who, now).unwrap() <= balance);
    }

    let globals = engine.globals().unwrap();
    prop_assert_eq!(globals.forfeited_pool, tally.forfeited - tally.claimed);
    prop_assert_eq!(
        engine.balance_of(&AccountId::FORFEIT_POOL).unwrap(),
        globals.forfeited_pool
    );

    let report = engine.audit().unwrap();
    prop_assert!(report.is_clean(), "violations: {:?}", report.violations);
    prop_assert_eq!(report.recomputed_weight, globals.total_weighted_contribution);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Bookkeeping holds after every step of a random history.
    #[test]
    fn bookkeeping_survives_random_histories(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut engine = memory_engine();
        let mut now = 0u64;
        let mut tally = Tally::default();
        for op in &ops {
            apply(&mut engine, op, &mut now, &mut tally)
                .map_err(|e| TestCaseError::fail(format!("{op:?} failed: {e}")))?;
            check_invariants(&engine, now, &tally)?;
        }
    }

    /// A tight capacity forces merges constantly without breaking anything.
    #[test]
    fn tight_capacity_histories(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut engine = engine_with(EngineConfig { max_records: 2, ..EngineConfig::default() });
        let mut now = 0u64;
        let mut tally = Tally::default();
        for op in &ops {
            apply(&mut engine, op, &mut now, &mut tally)
                .map_err(|e| TestCaseError::fail(format!("{op:?} failed: {e}")))?;
            prop_assert!(engine.audit().unwrap().is_clean());
            for seed in 1..=ACCOUNTS {
                prop_assert!(engine.records(&id(seed)).unwrap().len() <= 2);
            }
        }
    }

    /// After maturity nothing an account holds is forfeitable, whatever
    /// mix of deposits, payouts and cleaned-up records produced it.
    #[test]
    fn matured_balances_move_whole(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut engine = memory_engine();
        let mut now = 0u64;
        let mut tally = Tally::default();
        for op in &ops {
            apply(&mut engine, op, &mut now, &mut tally)
                .map_err(|e| TestCaseError::fail(format!("{op:?} failed: {e}")))?;
        }

        let mut horizon = now;
        for seed in 1..=ACCOUNTS {
            for r in engine.records(&id(seed)).unwrap() {
                horizon = horizon.max(r.vest_complete);
            }
        }

        // An exempt sink takes the value without opening new records.
        let sink = id(ACCOUNTS + 1);
        engine.set_exempt(&sink, true).unwrap();
        for seed in 1..=ACCOUNTS {
            let who = id(seed);
            let balance = engine.balance_of(&who).unwrap();
            prop_assert_eq!(engine.vested_balance(&who, horizon).unwrap(), balance);
            let receipt = engine.move_funds(&who, &sink, balance, horizon).unwrap();
            prop_assert_eq!(receipt.forfeited, 0, "account {} forfeited at maturity", seed);
            prop_assert_eq!(receipt.amount, balance);
        }
        prop_assert!(engine.audit().unwrap().is_clean());
    }

    /// Value is neither created nor destroyed by movements and claims.
    #[test]
    fn total_supply_tracks_deposits(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut engine = memory_engine();
        let mut now = 0u64;
        let mut tally = Tally::default();
        let mut minted = 0u64;
        for op in &ops {
            if let Op::Deposit { amount, .. } = op {
                minted += amount;
            }
            apply(&mut engine, op, &mut now, &mut tally)
                .map_err(|e| TestCaseError::fail(format!("{op:?} failed: {e}")))?;
        }
        let mut held = engine.balance_of(&AccountId::FORFEIT_POOL).unwrap();
        for seed in 1..=ACCOUNTS {
            held += engine.balance_of(&id(seed)).unwrap();
        }
        prop_assert_eq!(held, minted);
    }

    /// The vested fraction of a lone deposit never decreases with time.
    #[test]
    fn vested_balance_monotone(amount in 1u64..1_000_000_000_000, t1 in 0u64..60 * DAY, dt in 0u64..60 * DAY) {
        let mut engine = memory_engine();
        let a = id(1);
        engine.deposit(&a, amount, 0).unwrap();
        let early = engine.vested_balance(&a, t1).unwrap();
        let late = engine.vested_balance(&a, t1 + dt).unwrap();
        prop_assert!(early <= late);
        prop_assert!(late <= amount);
        prop_assert!(early >= amount / 2);
    }
}
