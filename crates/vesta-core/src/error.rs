//! Error types for the vesting engine.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VestingError {
    #[error("invalid participant (zero or engine-held account)")] ZeroAddress,
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: u64, need: u64 },
    #[error("nothing to claim")] NothingToClaim,
    #[error("already claimed")] AlreadyClaimed,
    #[error("invalid merkle proof")] InvalidProof,
    #[error("record capacity exhausted")] CapacityExhausted,
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("re-entrant call rejected")] Reentrant,
    #[error("insufficient distribution reserve: have {have}, need {need}")] InsufficientReserve { have: u64, need: u64 },
    #[error("invalid account: {0}")] InvalidAccount(String),
    #[error("invalid config: {0}")] InvalidConfig(String),
    #[error("storage: {0}")] Storage(String),
}
