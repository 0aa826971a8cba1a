//! Checked integer helpers.
//!
//! Every helper rounds toward zero and reports overflow as
//! [`VestingError::ArithmeticOverflow`] instead of wrapping.

use vesta_core::constants::PRECISION;
use vesta_core::error::VestingError;

/// `a * b / d`, floor, with a `u128` intermediate.
///
/// Division by zero is reported as overflow.
pub fn mul_div(a: u128, b: u128, d: u128) -> Result<u128, VestingError> {
    if d == 0 {
        return Err(VestingError::ArithmeticOverflow);
    }
    a.checked_mul(b)
        .map(|v| v / d)
        .ok_or(VestingError::ArithmeticOverflow)
}

/// Fixed-point multiply: `a * b / PRECISION`, floor.
pub fn fixed_mul(a: u128, b: u128) -> Result<u128, VestingError> {
    mul_div(a, b, PRECISION)
}

/// Narrow a `u128` to `u64`.
pub fn to_u64(v: u128) -> Result<u64, VestingError> {
    u64::try_from(v).map_err(|_| VestingError::ArithmeticOverflow)
}

pub fn add(a: u64, b: u64) -> Result<u64, VestingError> {
    a.checked_add(b).ok_or(VestingError::ArithmeticOverflow)
}

pub fn sub(a: u64, b: u64) -> Result<u64, VestingError> {
    a.checked_sub(b).ok_or(VestingError::ArithmeticOverflow)
}

/// Replace `old` with `new` inside an aggregate: `total - old + new`.
///
/// The aggregate is never re-summed; callers pass the exact contribution
/// they previously added.
pub fn swap_contribution(total: u128, old: u128, new: u128) -> Result<u128, VestingError> {
    total
        .checked_sub(old)
        .and_then(|t| t.checked_add(new))
        .ok_or(VestingError::ArithmeticOverflow)
}
