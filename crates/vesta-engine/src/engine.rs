//! The vesting engine facade.
//!
//! Every entry point stages its work in a [`Journal`] and finishes with a
//! single [`VestingStore::commit`]. An error anywhere before the commit
//! drops the journal, so a failed call leaves no trace in the store.

use tracing::{debug, info, warn};

use vesta_core::error::VestingError;
use vesta_core::events::VestingEvent;
use vesta_core::merkle;
use vesta_core::store::ChangeSet;
use vesta_core::traits::VestingStore;
use vesta_core::types::{AccountId, GlobalState, Hash256, VestingRecord};

use crate::compounding::refresh_account;
use crate::config::EngineConfig;
use crate::distributor;
use crate::forfeiture;
use crate::journal::Journal;
use crate::math::sub;
use crate::records::{cleanup, create_or_merge};
use crate::vesting::account_vested;

/// Outcome of a committed entry point.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Receipt {
    /// Value delivered, paid out or credited by the call.
    pub amount: u64,
    /// Value routed into the pool by the call.
    pub forfeited: u64,
    /// Notifications, in the order they were produced.
    pub events: Vec<VestingEvent>,
}

/// Brute-force consistency check over persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuditReport {
    pub accounts: usize,
    pub records: usize,
    /// Σ of per-account cached weights.
    pub cached_weight: u128,
    /// Σ of per-record weights, recomputed from scratch.
    pub recomputed_weight: u128,
    pub globals: GlobalState,
    /// Ledger balance backing the pool.
    pub pool_balance: u64,
    pub violations: Vec<String>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Vesting, forfeiture and distribution over a [`VestingStore`].
pub struct VestingEngine<S: VestingStore> {
    store: S,
    config: EngineConfig,
}

impl<S: VestingStore> VestingEngine<S> {
    /// Create an engine over `store`. Fails if `config` does not validate.
    pub fn new(store: S, config: EngineConfig) -> Result<Self, VestingError> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Write a finished journal's changes. Empty sets skip the store.
    fn apply(
        &mut self,
        (changes, events): (ChangeSet, Vec<VestingEvent>),
    ) -> Result<Vec<VestingEvent>, VestingError> {
        if !changes.is_empty() {
            self.store.commit(changes)?;
        }
        Ok(events)
    }

    fn participant(account: &AccountId) -> Result<(), VestingError> {
        if account.is_participant() {
            Ok(())
        } else {
            Err(VestingError::ZeroAddress)
        }
    }

    // --- Entry points ---

    /// Credit `amount` from outside the system to `to`.
    ///
    /// Opens or extends a record unless `to` is exempt. Zero is a no-op.
    pub fn deposit(&mut self, to: &AccountId, amount: u64, now: u64) -> Result<Receipt, VestingError> {
        Self::participant(to)?;
        if amount == 0 {
            return Ok(Receipt::default());
        }

        let mut journal = Journal::new(&self.store);
        journal.mint(to, amount)?;
        if !journal.is_exempt(to)? {
            let mut acct = journal.account(to)?;
            let mut globals = journal.globals()?;
            refresh_account(to, &mut acct, &mut globals, now, &self.config, journal.events_mut())?;
            create_or_merge(to, &mut acct, &mut globals, amount, now, &self.config, journal.events_mut())?;
            journal.put_account(*to, acct);
            journal.put_globals(globals);
        }

        let staged = journal.finish();
        let events = self.apply(staged)?;
        debug!(%to, amount, "deposit committed");
        Ok(Receipt {
            amount,
            forfeited: 0,
            events,
        })
    }

    /// Move `amount` from `from` to `to`, forfeiting any unvested shortfall.
    ///
    /// Returns the delivered amount in [`Receipt::amount`]. Zero is a no-op.
    pub fn move_funds(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
        now: u64,
    ) -> Result<Receipt, VestingError> {
        Self::participant(from)?;
        Self::participant(to)?;
        if amount == 0 {
            return Ok(Receipt::default());
        }

        let mut journal = Journal::new(&self.store);
        let outcome = forfeiture::route(&mut journal, &self.config, from, to, amount, now)?;
        let staged = journal.finish();
        let events = self.apply(staged)?;
        Ok(Receipt {
            amount: outcome.delivered,
            forfeited: outcome.forfeited,
            events,
        })
    }

    /// Pay out the account's outstanding share of the forfeited pool.
    pub fn claim(&mut self, account: &AccountId, now: u64) -> Result<Receipt, VestingError> {
        Self::participant(account)?;

        let mut journal = Journal::new(&self.store);
        let mut acct = journal.account(account)?;
        let mut globals = journal.globals()?;
        refresh_account(account, &mut acct, &mut globals, now, &self.config, journal.events_mut())?;

        let amount = distributor::claimable(&acct, &globals)?;
        if amount == 0 {
            return Err(VestingError::NothingToClaim);
        }
        distributor::distribute(&mut acct, &globals, amount)?;
        globals.forfeited_pool = sub(globals.forfeited_pool, amount)?;
        cleanup(account, &mut acct, &mut globals, journal.events_mut())?;
        journal.put_account(*account, acct);
        journal.put_globals(globals);

        journal.transfer(&AccountId::FORFEIT_POOL, account, amount)?;
        journal.emit(VestingEvent::PoolClaimed {
            account: *account,
            amount,
            pool: globals.forfeited_pool,
        });

        let staged = journal.finish();
        let events = self.apply(staged)?;
        info!(%account, amount, pool = globals.forfeited_pool, "pool share claimed");
        Ok(Receipt {
            amount,
            forfeited: 0,
            events,
        })
    }

    /// One-time payout from the distribution reserve against the published root.
    ///
    /// The claimed flag is per account: once set, no other leaf for the same
    /// account can be claimed.
    pub fn merkle_claim(
        &mut self,
        index: u64,
        account: &AccountId,
        amount: u64,
        proof: &[Hash256],
    ) -> Result<Receipt, VestingError> {
        Self::participant(account)?;

        let mut journal = Journal::new(&self.store);
        if journal.merkle_claimed(account)? {
            return Err(VestingError::AlreadyClaimed);
        }
        journal.mark_merkle_claimed(*account);

        let root = journal.merkle_root()?;
        let leaf = merkle::leaf_hash(index, account, amount);
        if !merkle::verify(proof, &root, &leaf) {
            warn!(index, %account, amount, "merkle proof rejected");
            return Err(VestingError::InvalidProof);
        }

        let have = journal.balance(&AccountId::DISTRIBUTION_RESERVE)?;
        if have < amount {
            return Err(VestingError::InsufficientReserve { have, need: amount });
        }
        journal.transfer(&AccountId::DISTRIBUTION_RESERVE, account, amount)?;
        journal.emit(VestingEvent::MerkleClaimed {
            index,
            account: *account,
            amount,
        });

        let staged = journal.finish();
        let events = self.apply(staged)?;
        info!(index, %account, amount, "merkle claim paid");
        Ok(Receipt {
            amount,
            forfeited: 0,
            events,
        })
    }

    /// Apply pending full-vest transitions and accrual without moving value.
    pub fn touch_account(&mut self, account: &AccountId, now: u64) -> Result<Receipt, VestingError> {
        Self::participant(account)?;

        let mut journal = Journal::new(&self.store);
        let mut acct = journal.account(account)?;
        if acct.records.is_empty() {
            return Ok(Receipt::default());
        }
        let mut globals = journal.globals()?;
        refresh_account(account, &mut acct, &mut globals, now, &self.config, journal.events_mut())?;
        journal.put_account(*account, acct);
        journal.put_globals(globals);

        let staged = journal.finish();
        let events = self.apply(staged)?;
        Ok(Receipt {
            amount: 0,
            forfeited: 0,
            events,
        })
    }

    // --- Administration ---

    pub fn set_exempt(&mut self, account: &AccountId, exempt: bool) -> Result<(), VestingError> {
        Self::participant(account)?;
        let mut journal = Journal::new(&self.store);
        journal.set_exempt(*account, exempt);
        let staged = journal.finish();
        self.apply(staged)?;
        info!(%account, exempt, "exemption updated");
        Ok(())
    }

    pub fn set_merkle_root(&mut self, root: Hash256) -> Result<(), VestingError> {
        let mut journal = Journal::new(&self.store);
        journal.set_merkle_root(root);
        let staged = journal.finish();
        self.apply(staged)?;
        info!(%root, "merkle root published");
        Ok(())
    }

    /// Credit the distribution reserve that backs Merkle claims.
    pub fn fund_reserve(&mut self, amount: u64) -> Result<Receipt, VestingError> {
        let mut journal = Journal::new(&self.store);
        journal.mint(&AccountId::DISTRIBUTION_RESERVE, amount)?;
        let staged = journal.finish();
        let events = self.apply(staged)?;
        info!(amount, "distribution reserve funded");
        Ok(Receipt {
            amount,
            forfeited: 0,
            events,
        })
    }

    // --- Queries ---

    pub fn balance_of(&self, account: &AccountId) -> Result<u64, VestingError> {
        self.store.balance_of(account)
    }

    pub fn is_exempt(&self, account: &AccountId) -> Result<bool, VestingError> {
        self.store.is_exempt(account)
    }

    pub fn globals(&self) -> Result<GlobalState, VestingError> {
        self.store.globals()
    }

    pub fn merkle_root(&self) -> Result<Hash256, VestingError> {
        self.store.merkle_root()
    }

    pub fn merkle_claimed(&self, account: &AccountId) -> Result<bool, VestingError> {
        self.store.merkle_claimed(account)
    }

    /// Persisted records, as of the last commit (no refresh applied).
    pub fn records(&self, account: &AccountId) -> Result<Vec<VestingRecord>, VestingError> {
        Ok(self
            .store
            .account(account)?
            .map(|acct| acct.records)
            .unwrap_or_default())
    }

    /// What `account` could move at `now` without forfeiting.
    pub fn vested_balance(&self, account: &AccountId, now: u64) -> Result<u64, VestingError> {
        let mut journal = Journal::new(&self.store);
        let mut acct = journal.account(account)?;
        let mut globals = journal.globals()?;
        refresh_account(account, &mut acct, &mut globals, now, &self.config, journal.events_mut())?;
        account_vested(&acct, journal.balance(account)?, now, self.config.vesting_duration)
    }

    /// What [`claim`](Self::claim) would pay at `now`. Never writes.
    pub fn claimable(&self, account: &AccountId, now: u64) -> Result<u64, VestingError> {
        let mut journal = Journal::new(&self.store);
        let mut acct = journal.account(account)?;
        let mut globals = journal.globals()?;
        refresh_account(account, &mut acct, &mut globals, now, &self.config, journal.events_mut())?;
        distributor::claimable(&acct, &globals)
    }

    /// Recompute aggregates from scratch and compare with the cached ones.
    pub fn audit(&self) -> Result<AuditReport, VestingError> {
        let mut report = AuditReport {
            globals: self.store.globals()?,
            pool_balance: self.store.balance_of(&AccountId::FORFEIT_POOL)?,
            ..AuditReport::default()
        };

        for (id, acct) in self.store.accounts()? {
            report.accounts += 1;
            report.records += acct.records.len();
            if acct.records.len() > self.config.max_records {
                report.violations.push(format!(
                    "{id}: {} records exceeds capacity {}",
                    acct.records.len(),
                    self.config.max_records
                ));
            }
            let mut weight: u128 = 0;
            for (slot, record) in acct.records.iter().enumerate() {
                if record.locked > record.principal {
                    report.violations.push(format!(
                        "{id}[{slot}]: locked {} exceeds principal {}",
                        record.locked, record.principal
                    ));
                }
                weight = weight.saturating_add(record.weighted()?);
            }
            if weight != acct.weighted_contribution {
                report.violations.push(format!(
                    "{id}: cached weight {} != recomputed {weight}",
                    acct.weighted_contribution
                ));
            }
            report.cached_weight = report.cached_weight.saturating_add(acct.weighted_contribution);
            report.recomputed_weight = report.recomputed_weight.saturating_add(weight);
        }

        if report.cached_weight != report.globals.total_weighted_contribution {
            report.violations.push(format!(
                "total weight {} != Σ cached {}",
                report.globals.total_weighted_contribution, report.cached_weight
            ));
        }
        if report.pool_balance != report.globals.forfeited_pool {
            report.violations.push(format!(
                "pool {} != pool ledger balance {}",
                report.globals.forfeited_pool, report.pool_balance
            ));
        }
        Ok(report)
    }
}
