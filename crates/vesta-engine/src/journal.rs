//! Read-through staging area for a single entry point.
//!
//! A [`Journal`] reads from the store, keeps every write in a [`ChangeSet`]
//! and collects the events the call produces. Nothing reaches the store
//! until the engine commits the finished set; dropping a journal discards
//! all of it.

use vesta_core::error::VestingError;
use vesta_core::events::VestingEvent;
use vesta_core::store::ChangeSet;
use vesta_core::traits::VestingStore;
use vesta_core::types::{AccountId, AccountVesting, GlobalState, Hash256};

pub struct Journal<'a, S: VestingStore + ?Sized> {
    store: &'a S,
    changes: ChangeSet,
    events: Vec<VestingEvent>,
}

impl<'a, S: VestingStore + ?Sized> Journal<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            changes: ChangeSet::default(),
            events: Vec::new(),
        }
    }

    // --- Balances ---

    pub fn balance(&self, account: &AccountId) -> Result<u64, VestingError> {
        match self.changes.balances.get(account) {
            Some(b) => Ok(*b),
            None => self.store.balance_of(account),
        }
    }

    /// Move `amount` between two ledger accounts.
    ///
    /// Fails with `InsufficientBalance` if `from` cannot cover it.
    pub fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), VestingError> {
        let have = self.balance(from)?;
        if have < amount {
            return Err(VestingError::InsufficientBalance { have, need: amount });
        }
        self.changes.balances.insert(*from, have - amount);
        let credited = self
            .balance(to)?
            .checked_add(amount)
            .ok_or(VestingError::ArithmeticOverflow)?;
        self.changes.balances.insert(*to, credited);
        self.emit(VestingEvent::Transfer {
            from: *from,
            to: *to,
            amount,
        });
        Ok(())
    }

    /// Credit `amount` to `to` with no sender.
    pub fn mint(&mut self, to: &AccountId, amount: u64) -> Result<(), VestingError> {
        let credited = self
            .balance(to)?
            .checked_add(amount)
            .ok_or(VestingError::ArithmeticOverflow)?;
        self.changes.balances.insert(*to, credited);
        self.emit(VestingEvent::Deposit { to: *to, amount });
        Ok(())
    }

    // --- Vesting state ---

    /// Staged or persisted record collection; empty for unknown accounts.
    pub fn account(&self, account: &AccountId) -> Result<AccountVesting, VestingError> {
        match self.changes.accounts.get(account) {
            Some(acct) => Ok(acct.clone()),
            None => Ok(self.store.account(account)?.unwrap_or_default()),
        }
    }

    pub fn put_account(&mut self, account: AccountId, acct: AccountVesting) {
        self.changes.accounts.insert(account, acct);
    }

    pub fn globals(&self) -> Result<GlobalState, VestingError> {
        match self.changes.globals {
            Some(g) => Ok(g),
            None => self.store.globals(),
        }
    }

    pub fn put_globals(&mut self, globals: GlobalState) {
        self.changes.globals = Some(globals);
    }

    pub fn is_exempt(&self, account: &AccountId) -> Result<bool, VestingError> {
        match self.changes.exempt.get(account) {
            Some(e) => Ok(*e),
            None => self.store.is_exempt(account),
        }
    }

    pub fn set_exempt(&mut self, account: AccountId, exempt: bool) {
        self.changes.exempt.insert(account, exempt);
    }

    // --- Merkle path ---

    pub fn merkle_claimed(&self, account: &AccountId) -> Result<bool, VestingError> {
        if self.changes.merkle_claimed.contains(account) {
            return Ok(true);
        }
        self.store.merkle_claimed(account)
    }

    pub fn mark_merkle_claimed(&mut self, account: AccountId) {
        self.changes.merkle_claimed.insert(account);
    }

    pub fn merkle_root(&self) -> Result<Hash256, VestingError> {
        match self.changes.merkle_root {
            Some(root) => Ok(root),
            None => self.store.merkle_root(),
        }
    }

    pub fn set_merkle_root(&mut self, root: Hash256) {
        self.changes.merkle_root = Some(root);
    }

    // --- Events ---

    pub fn emit(&mut self, event: VestingEvent) {
        self.events.push(event);
    }

    pub fn events_mut(&mut self) -> &mut Vec<VestingEvent> {
        &mut self.events
    }

    /// Hand over the staged writes and events, releasing the store borrow.
    pub fn finish(self) -> (ChangeSet, Vec<VestingEvent>) {
        (self.changes, self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesta_core::store::MemoryStore;
    use vesta_core::traits::BalanceLedger;
    use vesta_core::types::VestingRecord;

    fn acct(seed: u8) -> AccountId {
        AccountId([seed; 32])
    }

    fn funded(seed: u8, amount: u64) -> MemoryStore {
        let mut store = MemoryStore::new();
        let mut cs = ChangeSet::default();
        cs.balances.insert(acct(seed), amount);
        store.commit(cs).unwrap();
        store
    }

    #[test]
    fn reads_fall_through_to_store() {
        let store = funded(1, 100);
        let j = Journal::new(&store);
        assert_eq!(j.balance(&acct(1)).unwrap(), 100);
        assert_eq!(j.balance(&acct(2)).unwrap(), 0);
        assert!(j.account(&acct(1)).unwrap().records.is_empty());
    }

    #[test]
    fn transfer_stages_both_sides() {
        let store = funded(1, 100);
        let mut j = Journal::new(&store);
        j.transfer(&acct(1), &acct(2), 40).unwrap();
        assert_eq!(j.balance(&acct(1)).unwrap(), 60);
        assert_eq!(j.balance(&acct(2)).unwrap(), 40);
        // Store untouched until commit.
        assert_eq!(store.balance_of(&acct(1)).unwrap(), 100);

        let (cs, events) = j.finish();
        assert_eq!(cs.balances.len(), 2);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn transfer_rejects_overdraft() {
        let store = funded(1, 10);
        let mut j = Journal::new(&store);
        assert_eq!(
            j.transfer(&acct(1), &acct(2), 11),
            Err(VestingError::InsufficientBalance { have: 10, need: 11 })
        );
        let (cs, events) = j.finish();
        assert!(cs.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn self_transfer_nets_zero() {
        let store = funded(1, 10);
        let mut j = Journal::new(&store);
        j.transfer(&acct(1), &acct(1), 10).unwrap();
        assert_eq!(j.balance(&acct(1)).unwrap(), 10);
    }

    #[test]
    fn staged_account_shadows_store() {
        let store = MemoryStore::new();
        let mut j = Journal::new(&store);
        let mut av = AccountVesting::default();
        av.records.push(VestingRecord::open(10, 0, 100).unwrap());
        j.put_account(acct(3), av.clone());
        assert_eq!(j.account(&acct(3)).unwrap(), av);
    }

    #[test]
    fn merkle_flag_visible_before_commit() {
        let store = MemoryStore::new();
        let mut j = Journal::new(&store);
        assert!(!j.merkle_claimed(&acct(4)).unwrap());
        j.mark_merkle_claimed(acct(4));
        assert!(j.merkle_claimed(&acct(4)).unwrap());
    }
}
