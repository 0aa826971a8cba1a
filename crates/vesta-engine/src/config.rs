//! Engine parameters.
//!
//! Provides [`EngineConfig`] with defaults from [`vesta_core::constants`].
//! Every field can be overridden programmatically; [`EngineConfig::validate`]
//! rejects combinations the arithmetic cannot support.

use vesta_core::constants::{
    DAILY_RATE, MAX_ACCRUAL_DAYS, MAX_RECORDS, MERGE_WINDOW, PRECISION, VESTING_DURATION,
};
use vesta_core::error::VestingError;

/// Parameters shared by every engine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Length of the linear vesting window, in seconds.
    pub vesting_duration: u64,
    /// Deposits this close to a record's last deposit fold into it.
    pub merge_window: u64,
    /// Capacity of an account's record collection.
    pub max_records: usize,
    /// Per-day growth factor of fully-vested records (`PRECISION` = 1.0).
    pub daily_rate: u128,
    /// Most days folded into one accrual step.
    pub max_accrual_days: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vesting_duration: VESTING_DURATION,
            merge_window: MERGE_WINDOW,
            max_records: MAX_RECORDS,
            daily_rate: DAILY_RATE,
            max_accrual_days: MAX_ACCRUAL_DAYS,
        }
    }
}

impl EngineConfig {
    /// Check that the parameters are usable.
    pub fn validate(&self) -> Result<(), VestingError> {
        if self.vesting_duration == 0 {
            return Err(VestingError::InvalidConfig("vesting_duration must be > 0".into()));
        }
        if self.max_records == 0 {
            return Err(VestingError::InvalidConfig("max_records must be > 0".into()));
        }
        if self.daily_rate < PRECISION {
            return Err(VestingError::InvalidConfig(format!(
                "daily_rate {} below unity {PRECISION}",
                self.daily_rate
            )));
        }
        if self.max_accrual_days == 0 {
            return Err(VestingError::InvalidConfig("max_accrual_days must be > 0".into()));
        }
        Ok(())
    }
}
