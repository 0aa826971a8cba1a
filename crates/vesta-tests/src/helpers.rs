//! Shared helpers for scenario, property and persistence tests.

use std::path::Path;

use vesta_core::merkle::MerkleLeaf;
use vesta_core::store::MemoryStore;
use vesta_core::types::AccountId;
use vesta_engine::{EngineConfig, VestingEngine};
use vesta_store::RocksStore;

/// Participant account from a seed byte. Seeds 0x00, 0xFE and 0xFF are
/// engine-held and rejected as participants.
pub fn id(seed: u8) -> AccountId {
    AccountId([seed; 32])
}

/// Fresh in-memory engine with default parameters.
pub fn memory_engine() -> VestingEngine<MemoryStore> {
    VestingEngine::new(MemoryStore::new(), EngineConfig::default()).unwrap()
}

/// In-memory engine with a custom configuration.
pub fn engine_with(config: EngineConfig) -> VestingEngine<MemoryStore> {
    VestingEngine::new(MemoryStore::new(), config).unwrap()
}

/// RocksDB-backed engine rooted at `dir`.
pub fn rocks_engine(dir: &Path) -> VestingEngine<RocksStore> {
    let store = RocksStore::open(dir.join("vestingdata")).unwrap();
    VestingEngine::new(store, EngineConfig::default()).unwrap()
}

/// Leaves `index = position`, accounts seeded from 1, amounts from `amounts`.
pub fn leaves(amounts: &[u64]) -> Vec<MerkleLeaf> {
    amounts
        .iter()
        .enumerate()
        .map(|(i, &amount)| MerkleLeaf {
            index: i as u64,
            account: id(i as u8 + 1),
            amount,
        })
        .collect()
}

/// Panic with the audit's violations if the engine's aggregates drifted.
pub fn assert_audit_clean<S: vesta_core::traits::VestingStore>(engine: &VestingEngine<S>) {
    let report = engine.audit().unwrap();
    assert!(report.is_clean(), "audit violations: {:#?}", report.violations);
}
