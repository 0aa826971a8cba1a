//! # vesta-core
//! Foundation types, traits and Merkle hashing for the vesting engine.

pub mod constants;
pub mod error;
pub mod events;
pub mod merkle;
pub mod store;
pub mod traits;
pub mod types;

pub use error::VestingError;
pub use events::VestingEvent;
pub use store::{ChangeSet, MemoryStore};
pub use traits::{BalanceLedger, VestingStore};
pub use types::{AccountId, AccountVesting, GlobalState, Hash256, VestingRecord};
