//! # vesta-engine — Vesting, forfeiture and pool distribution.
//!
//! All calculations use checked integer arithmetic; fixed-point values are
//! `u128` scaled by `PRECISION`.
//!
//! - **Vesting**: half of every deposit is free on arrival, the other half
//!   vests linearly; records flip to fully vested lazily on touch.
//! - **Forfeiture**: moving more than the vested balance routes the
//!   shortfall into a shared pool, taken from locked value oldest first.
//! - **Compounding**: fully-vested records grow a multiplier per whole day;
//!   the global weight total is maintained by deltas.
//! - **Distribution**: the pool is claimable pro rata to weight; a
//!   Merkle-proof path pays externally computed allocations.

pub mod compounding;
pub mod config;
pub mod distributor;
pub mod engine;
pub mod forfeiture;
pub mod journal;
pub mod math;
pub mod records;
pub mod service;
pub mod vesting;

pub use config::EngineConfig;
pub use engine::{AuditReport, Receipt, VestingEngine};
pub use forfeiture::MoveOutcome;
pub use records::Placement;
pub use service::{EventSink, TracingSink, VestingService};
