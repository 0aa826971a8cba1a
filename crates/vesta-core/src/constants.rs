//! Protocol constants. Amounts are in base units, timestamps in Unix seconds.

/// Seconds in one day. Accrual advances only in whole multiples of this.
pub const DAY: u64 = 86_400;

/// Fixed-point precision for multipliers and rates (1.0 = 10^18).
pub const PRECISION: u128 = 1_000_000_000_000_000_000;

/// Default length of the linear vesting window for a new record.
///
/// Value: 30 days * 86 400 s = 2 592 000 seconds.
pub const VESTING_DURATION: u64 = 30 * DAY;

/// Default window within which a new deposit folds into an existing,
/// not-yet-fully-vested record instead of opening a new one.
pub const MERGE_WINDOW: u64 = DAY;

/// Default capacity of an account's record collection.
pub const MAX_RECORDS: usize = 10;

/// Default per-day growth factor applied to fully-vested records (1.001 = +0.1 %/day).
pub const DAILY_RATE: u128 = 1_001_000_000_000_000_000;

/// Upper bound on the number of days folded into a single accrual step.
///
/// Any remainder carries over to the next touch.
pub const MAX_ACCRUAL_DAYS: u64 = 365;

/// Fraction of a new deposit that starts out locked, as a divisor.
///
/// `locked = amount / LOCKED_DIVISOR`; the remaining half is vested on arrival.
pub const LOCKED_DIVISOR: u64 = 2;
