//! Trait interfaces between the engine and its collaborators.
//!
//! - [`BalanceLedger`] — the fungible-balance primitive the engine reads
//! - [`VestingStore`] — persisted vesting state plus atomic commits
//!   (implemented in-memory by [`MemoryStore`](crate::store::MemoryStore)
//!   and on RocksDB by vesta-store)

use crate::error::VestingError;
use crate::store::ChangeSet;
use crate::types::{AccountId, AccountVesting, GlobalState, Hash256};

/// Read side of the balance ledger.
///
/// Balance movement is staged by the engine and written through
/// [`VestingStore::commit`], so a failed call never moves value.
pub trait BalanceLedger {
    /// Current balance of `account`. Unknown accounts hold zero.
    fn balance_of(&self, account: &AccountId) -> Result<u64, VestingError>;
}

/// Persisted vesting state.
///
/// Not thread-safe: callers serialize access (see the engine's service
/// wrapper).
pub trait VestingStore: BalanceLedger + Send {
    /// Record collection and cached weight. `None` if the account never held records.
    fn account(&self, account: &AccountId) -> Result<Option<AccountVesting>, VestingError>;

    /// Pool and aggregate weight.
    fn globals(&self) -> Result<GlobalState, VestingError>;

    /// Whether vesting logic is bypassed for `account`.
    fn is_exempt(&self, account: &AccountId) -> Result<bool, VestingError>;

    /// Whether `account` already used its one-time Merkle claim.
    fn merkle_claimed(&self, account: &AccountId) -> Result<bool, VestingError>;

    /// Published Merkle root ([`Hash256::ZERO`] if none).
    fn merkle_root(&self) -> Result<Hash256, VestingError>;

    /// Every account with persisted records. Used by audits, never by entry points.
    fn accounts(&self) -> Result<Vec<(AccountId, AccountVesting)>, VestingError>;

    /// Apply a staged change set atomically: all of it or none of it.
    fn commit(&mut self, changes: ChangeSet) -> Result<(), VestingError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    // Object safety: both traits must stay dyn-compatible.

    fn _assert_ledger_object_safe(l: &dyn BalanceLedger) {
        let _ = l.balance_of(&AccountId::ZERO);
    }

    fn _assert_store_object_safe(s: &dyn VestingStore) {
        let _ = s.globals();
    }

    #[test]
    fn memory_store_through_dyn() {
        let store = MemoryStore::new();
        let dyn_store: &dyn VestingStore = &store;
        assert_eq!(dyn_store.balance_of(&AccountId([1; 32])).unwrap(), 0);
        assert_eq!(dyn_store.globals().unwrap(), GlobalState::default());
        assert!(dyn_store.merkle_root().unwrap().is_zero());
    }
}
