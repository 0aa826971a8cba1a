//! Serialized access to a [`VestingEngine`] with re-entrancy protection.
//!
//! Calls from different threads queue on a reentrant lock. A call made from
//! the thread already inside the engine (an event sink calling back, or a
//! closure passed to [`VestingService::with_engine`]) finds the engine
//! borrowed and fails with [`VestingError::Reentrant`]. Sinks run after the
//! commit with the engine still borrowed.

use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use tracing::{info, warn};

use vesta_core::error::VestingError;
use vesta_core::events::VestingEvent;
use vesta_core::traits::VestingStore;
use vesta_core::types::{AccountId, GlobalState, Hash256, VestingRecord};

use crate::engine::{AuditReport, Receipt, VestingEngine};

/// Receives notifications from committed calls.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &VestingEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn on_event(&self, event: &VestingEvent) {
        match event {
            VestingEvent::Forfeited { account, amount, pool } => {
                warn!(%account, amount, pool, "forfeiture");
            }
            other => info!(account = %other.account(), event = ?other, "vesting event"),
        }
    }
}

/// Thread-safe front for a [`VestingEngine`].
pub struct VestingService<S: VestingStore> {
    engine: ReentrantMutex<RefCell<VestingEngine<S>>>,
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
}

impl<S: VestingStore> VestingService<S> {
    pub fn new(engine: VestingEngine<S>) -> Self {
        Self {
            engine: ReentrantMutex::new(RefCell::new(engine)),
            sinks: RwLock::new(Vec::new()),
        }
    }

    pub fn add_sink(&self, sink: Arc<dyn EventSink>) {
        self.sinks.write().push(sink);
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with_engine<R>(
        &self,
        f: impl FnOnce(&mut VestingEngine<S>) -> R,
    ) -> Result<R, VestingError> {
        let guard = self.engine.lock();
        let mut engine = guard.try_borrow_mut().map_err(|_| VestingError::Reentrant)?;
        Ok(f(&mut engine))
    }

    /// Run a mutating engine call and notify sinks with the lock held.
    fn guarded(
        &self,
        f: impl FnOnce(&mut VestingEngine<S>) -> Result<Receipt, VestingError>,
    ) -> Result<Receipt, VestingError> {
        let guard = self.engine.lock();
        let mut engine = guard.try_borrow_mut().map_err(|_| VestingError::Reentrant)?;
        let receipt = f(&mut engine)?;
        let sinks = self.sinks.read().clone();
        for event in &receipt.events {
            for sink in &sinks {
                sink.on_event(event);
            }
        }
        Ok(receipt)
    }

    pub fn deposit(&self, to: &AccountId, amount: u64, now: u64) -> Result<Receipt, VestingError> {
        self.guarded(|e| e.deposit(to, amount, now))
    }

    pub fn move_funds(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
        now: u64,
    ) -> Result<Receipt, VestingError> {
        self.guarded(|e| e.move_funds(from, to, amount, now))
    }

    pub fn claim(&self, account: &AccountId, now: u64) -> Result<Receipt, VestingError> {
        self.guarded(|e| e.claim(account, now))
    }

    pub fn merkle_claim(
        &self,
        index: u64,
        account: &AccountId,
        amount: u64,
        proof: &[Hash256],
    ) -> Result<Receipt, VestingError> {
        self.guarded(|e| e.merkle_claim(index, account, amount, proof))
    }

    pub fn touch_account(&self, account: &AccountId, now: u64) -> Result<Receipt, VestingError> {
        self.guarded(|e| e.touch_account(account, now))
    }

    pub fn fund_reserve(&self, amount: u64) -> Result<Receipt, VestingError> {
        self.guarded(|e| e.fund_reserve(amount))
    }

    pub fn set_exempt(&self, account: &AccountId, exempt: bool) -> Result<(), VestingError> {
        self.with_engine(|e| e.set_exempt(account, exempt))?
    }

    pub fn set_merkle_root(&self, root: Hash256) -> Result<(), VestingError> {
        self.with_engine(|e| e.set_merkle_root(root))?
    }

    pub fn balance_of(&self, account: &AccountId) -> Result<u64, VestingError> {
        self.with_engine(|e| e.balance_of(account))?
    }

    pub fn vested_balance(&self, account: &AccountId, now: u64) -> Result<u64, VestingError> {
        self.with_engine(|e| e.vested_balance(account, now))?
    }

    pub fn claimable(&self, account: &AccountId, now: u64) -> Result<u64, VestingError> {
        self.with_engine(|e| e.claimable(account, now))?
    }

    pub fn records(&self, account: &AccountId) -> Result<Vec<VestingRecord>, VestingError> {
        self.with_engine(|e| e.records(account))?
    }

    pub fn globals(&self) -> Result<GlobalState, VestingError> {
        self.with_engine(|e| e.globals())?
    }

    pub fn audit(&self) -> Result<AuditReport, VestingError> {
        self.with_engine(|e| e.audit())?
    }
}
