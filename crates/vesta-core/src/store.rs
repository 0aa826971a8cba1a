//! Staged change sets and the in-memory [`VestingStore`].
//!
//! A [`ChangeSet`] carries absolute post-call values for everything a call
//! touched. Stores apply it in one step; the [`MemoryStore`] is suitable for
//! tests and embedding, the persistent store lives in vesta-store.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::error::VestingError;
use crate::traits::{BalanceLedger, VestingStore};
use crate::types::{AccountId, AccountVesting, GlobalState, Hash256};

/// Everything a single entry point wants to write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// New balances (absolute values).
    pub balances: BTreeMap<AccountId, u64>,
    /// New record collections. An empty collection deletes the entry.
    pub accounts: BTreeMap<AccountId, AccountVesting>,
    /// New global aggregates, if they changed.
    pub globals: Option<GlobalState>,
    /// Exemption flags to set (`true`) or clear (`false`).
    pub exempt: BTreeMap<AccountId, bool>,
    /// Accounts whose one-time Merkle flag gets set.
    pub merkle_claimed: BTreeSet<AccountId>,
    /// Newly published Merkle root.
    pub merkle_root: Option<Hash256>,
}

impl ChangeSet {
    /// Whether applying this set would change nothing.
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
            && self.accounts.is_empty()
            && self.globals.is_none()
            && self.exempt.is_empty()
            && self.merkle_claimed.is_empty()
            && self.merkle_root.is_none()
    }
}

/// In-memory vesting state for testing.
///
/// Everything lives in `HashMap`s with no persistence.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    balances: HashMap<AccountId, u64>,
    accounts: HashMap<AccountId, AccountVesting>,
    globals: GlobalState,
    exempt: HashSet<AccountId>,
    merkle_claimed: HashSet<AccountId>,
    merkle_root: Hash256,
    /// Number of successful commits.
    commits: u64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of change sets applied so far.
    pub fn commit_count(&self) -> u64 {
        self.commits
    }
}

impl BalanceLedger for MemoryStore {
    fn balance_of(&self, account: &AccountId) -> Result<u64, VestingError> {
        Ok(self.balances.get(account).copied().unwrap_or(0))
    }
}

impl VestingStore for MemoryStore {
    fn account(&self, account: &AccountId) -> Result<Option<AccountVesting>, VestingError> {
        Ok(self.accounts.get(account).cloned())
    }

    fn globals(&self) -> Result<GlobalState, VestingError> {
        Ok(self.globals)
    }

    fn is_exempt(&self, account: &AccountId) -> Result<bool, VestingError> {
        Ok(self.exempt.contains(account))
    }

    fn merkle_claimed(&self, account: &AccountId) -> Result<bool, VestingError> {
        Ok(self.merkle_claimed.contains(account))
    }

    fn merkle_root(&self) -> Result<Hash256, VestingError> {
        Ok(self.merkle_root)
    }

    fn accounts(&self) -> Result<Vec<(AccountId, AccountVesting)>, VestingError> {
        let mut all: Vec<_> = self
            .accounts
            .iter()
            .map(|(id, acct)| (*id, acct.clone()))
            .collect();
        all.sort_by_key(|(id, _)| *id);
        Ok(all)
    }

    fn commit(&mut self, changes: ChangeSet) -> Result<(), VestingError> {
        for (id, balance) in changes.balances {
            if balance == 0 {
                self.balances.remove(&id);
            } else {
                self.balances.insert(id, balance);
            }
        }
        for (id, acct) in changes.accounts {
            if acct.is_empty() {
                self.accounts.remove(&id);
            } else {
                self.accounts.insert(id, acct);
            }
        }
        if let Some(globals) = changes.globals {
            self.globals = globals;
        }
        for (id, exempt) in changes.exempt {
            if exempt {
                self.exempt.insert(id);
            } else {
                self.exempt.remove(&id);
            }
        }
        self.merkle_claimed.extend(changes.merkle_claimed);
        if let Some(root) = changes.merkle_root {
            self.merkle_root = root;
        }
        self.commits += 1;
        Ok(())
    }
}
