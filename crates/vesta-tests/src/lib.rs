//! Integration test suite for Vesta.
//!
//! Scenario tests drive the engine through whole deposit, forfeit and claim
//! lifecycles; property tests replay random operation sequences and check
//! the bookkeeping invariants after every step.

pub mod helpers;
