//! # vesta-store — RocksDB persistence for vesting state.
//!
//! [`RocksStore`] implements [`vesta_core::VestingStore`] with one column
//! family per concern and applies every change set as a single atomic
//! write batch.

pub mod config;
pub mod storage;

pub use config::StoreConfig;
pub use storage::RocksStore;
