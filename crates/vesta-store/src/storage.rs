//! RocksDB-backed persistent vesting state.
//!
//! Implements [`VestingStore`] using column families for record collections,
//! balances, exemptions, Merkle claim flags and metadata. Every commit is a
//! single [`WriteBatch`], so a crash never leaves half a call on disk.

use std::path::Path;

use rocksdb::{ColumnFamilyDescriptor, Options, WriteBatch, DB};
use tracing::debug;

use vesta_core::error::VestingError;
use vesta_core::store::ChangeSet;
use vesta_core::traits::{BalanceLedger, VestingStore};
use vesta_core::types::{AccountId, AccountVesting, GlobalState, Hash256};

// --- Column family names ---

const CF_RECORDS: &str = "records";
const CF_BALANCES: &str = "balances";
const CF_EXEMPT: &str = "exempt";
const CF_MERKLE_CLAIMS: &str = "merkle_claims";
const CF_METADATA: &str = "metadata";

/// All column family names.
const ALL_CFS: &[&str] = &[CF_RECORDS, CF_BALANCES, CF_EXEMPT, CF_MERKLE_CLAIMS, CF_METADATA];

// --- Metadata keys ---

const META_FORFEITED_POOL: &[u8] = b"forfeited_pool";
const META_TOTAL_WEIGHT: &[u8] = b"total_weighted_contribution";
const META_MERKLE_ROOT: &[u8] = b"merkle_root";
const META_COMMITS: &[u8] = b"commits";

/// Presence marker for set-membership column families.
const FLAG: &[u8] = &[1];

fn storage_err(e: impl std::fmt::Display) -> VestingError {
    VestingError::Storage(e.to_string())
}

/// RocksDB-backed persistent vesting state.
///
/// Integers are stored little-endian at fixed width; record collections are
/// bincode-encoded. Zero balances and empty collections are deleted rather
/// than stored.
pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Open or create a RocksDB database at the given path.
    ///
    /// Creates all column families if they don't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VestingError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&db_opts, path.as_ref(), cf_descriptors)
            .map_err(storage_err)?;
        debug!(path = %path.as_ref().display(), "vesting store opened");
        Ok(Self { db })
    }

    /// Number of change sets committed over the store's lifetime.
    pub fn commit_count(&self) -> Result<u64, VestingError> {
        Ok(self.get_meta(META_COMMITS)?.map(u64_from).transpose()?.unwrap_or(0))
    }

    /// Flush all in-memory buffers to disk.
    pub fn flush(&self) -> Result<(), VestingError> {
        self.db.flush().map_err(storage_err)
    }

    /// Trigger manual compaction across all column families.
    pub fn compact(&self) -> Result<(), VestingError> {
        for cf_name in ALL_CFS {
            let cf = self.cf_handle(cf_name)?;
            self.db.compact_range_cf(cf, None::<&[u8]>, None::<&[u8]>);
        }
        Ok(())
    }

    // --- Internal helpers ---

    fn cf_handle(&self, name: &str) -> Result<&rocksdb::ColumnFamily, VestingError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| VestingError::Storage(format!("missing column family: {name}")))
    }

    fn get(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>, VestingError> {
        let cf = self.cf_handle(cf_name)?;
        self.db.get_cf(cf, key).map_err(storage_err)
    }

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, VestingError> {
        self.get(CF_METADATA, key)
    }
}

fn u64_from(bytes: Vec<u8>) -> Result<u64, VestingError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| VestingError::Storage("invalid u64 value length".into()))?;
    Ok(u64::from_le_bytes(arr))
}

fn u128_from(bytes: Vec<u8>) -> Result<u128, VestingError> {
    let arr: [u8; 16] = bytes
        .try_into()
        .map_err(|_| VestingError::Storage("invalid u128 value length".into()))?;
    Ok(u128::from_le_bytes(arr))
}

impl BalanceLedger for RocksStore {
    fn balance_of(&self, account: &AccountId) -> Result<u64, VestingError> {
        Ok(self
            .get(CF_BALANCES, account.as_bytes())?
            .map(u64_from)
            .transpose()?
            .unwrap_or(0))
    }
}

impl VestingStore for RocksStore {
    fn account(&self, account: &AccountId) -> Result<Option<AccountVesting>, VestingError> {
        match self.get(CF_RECORDS, account.as_bytes())? {
            Some(bytes) => {
                let (acct, _): (AccountVesting, _) =
                    bincode::decode_from_slice(&bytes, bincode::config::standard())
                        .map_err(storage_err)?;
                Ok(Some(acct))
            }
            None => Ok(None),
        }
    }

    fn globals(&self) -> Result<GlobalState, VestingError> {
        Ok(GlobalState {
            forfeited_pool: self
                .get_meta(META_FORFEITED_POOL)?
                .map(u64_from)
                .transpose()?
                .unwrap_or(0),
            total_weighted_contribution: self
                .get_meta(META_TOTAL_WEIGHT)?
                .map(u128_from)
                .transpose()?
                .unwrap_or(0),
        })
    }

    fn is_exempt(&self, account: &AccountId) -> Result<bool, VestingError> {
        Ok(self.get(CF_EXEMPT, account.as_bytes())?.is_some())
    }

    fn merkle_claimed(&self, account: &AccountId) -> Result<bool, VestingError> {
        Ok(self.get(CF_MERKLE_CLAIMS, account.as_bytes())?.is_some())
    }

    fn merkle_root(&self) -> Result<Hash256, VestingError> {
        match self.get_meta(META_MERKLE_ROOT)? {
            Some(bytes) => {
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| VestingError::Storage("invalid merkle root length".into()))?;
                Ok(Hash256(arr))
            }
            None => Ok(Hash256::ZERO),
        }
    }

    fn accounts(&self) -> Result<Vec<(AccountId, AccountVesting)>, VestingError> {
        let cf = self.cf_handle(CF_RECORDS)?;
        let mut all = Vec::new();

        let iter = self.db.iterator_cf(cf, rocksdb::IteratorMode::Start);
        for item in iter {
            let (key_bytes, value_bytes) = item.map_err(storage_err)?;
            let id: [u8; 32] = key_bytes
                .as_ref()
                .try_into()
                .map_err(|_| VestingError::Storage("invalid account key length".into()))?;
            let (acct, _): (AccountVesting, _) =
                bincode::decode_from_slice(&value_bytes, bincode::config::standard())
                    .map_err(storage_err)?;
            all.push((AccountId(id), acct));
        }

        Ok(all)
    }

    fn commit(&mut self, changes: ChangeSet) -> Result<(), VestingError> {
        let cf_records = self.cf_handle(CF_RECORDS)?;
        let cf_balances = self.cf_handle(CF_BALANCES)?;
        let cf_exempt = self.cf_handle(CF_EXEMPT)?;
        let cf_claims = self.cf_handle(CF_MERKLE_CLAIMS)?;
        let cf_meta = self.cf_handle(CF_METADATA)?;
        let mut batch = WriteBatch::default();

        for (id, balance) in &changes.balances {
            if *balance == 0 {
                batch.delete_cf(cf_balances, id.as_bytes());
            } else {
                batch.put_cf(cf_balances, id.as_bytes(), balance.to_le_bytes());
            }
        }

        for (id, acct) in &changes.accounts {
            if acct.is_empty() {
                batch.delete_cf(cf_records, id.as_bytes());
            } else {
                let bytes = bincode::encode_to_vec(acct, bincode::config::standard())
                    .map_err(storage_err)?;
                batch.put_cf(cf_records, id.as_bytes(), bytes);
            }
        }

        if let Some(globals) = changes.globals {
            batch.put_cf(cf_meta, META_FORFEITED_POOL, globals.forfeited_pool.to_le_bytes());
            batch.put_cf(
                cf_meta,
                META_TOTAL_WEIGHT,
                globals.total_weighted_contribution.to_le_bytes(),
            );
        }

        for (id, exempt) in &changes.exempt {
            if *exempt {
                batch.put_cf(cf_exempt, id.as_bytes(), FLAG);
            } else {
                batch.delete_cf(cf_exempt, id.as_bytes());
            }
        }

        for id in &changes.merkle_claimed {
            batch.put_cf(cf_claims, id.as_bytes(), FLAG);
        }

        if let Some(root) = changes.merkle_root {
            batch.put_cf(cf_meta, META_MERKLE_ROOT, root.as_bytes());
        }

        let commits = self.commit_count()? + 1;
        batch.put_cf(cf_meta, META_COMMITS, commits.to_le_bytes());

        self.db.write(batch).map_err(storage_err)?;
        debug!(
            commits,
            balances = changes.balances.len(),
            accounts = changes.accounts.len(),
            "change set committed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesta_core::constants::{PRECISION, VESTING_DURATION};
    use vesta_core::types::VestingRecord;

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Create a temporary RocksStore.
    fn temp_store() -> (RocksStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(dir.path().join("vestingdata")).unwrap();
        (store, dir)
    }

    fn acct(seed: u8) -> AccountId {
        AccountId([seed; 32])
    }

    fn sample_account() -> AccountVesting {
        let mut r = VestingRecord::open(1_000, 7, VESTING_DURATION).unwrap();
        r.fully_vested = true;
        r.multiplier = PRECISION + 123_456_789;
        r.claimed_share = 42;
        AccountVesting {
            weighted_contribution: r.weighted().unwrap(),
            records: vec![r, VestingRecord::open(55, 99, VESTING_DURATION).unwrap()],
        }
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[test]
    fn fresh_store_is_empty() {
        let (store, _dir) = temp_store();
        assert_eq!(store.balance_of(&acct(1)).unwrap(), 0);
        assert_eq!(store.globals().unwrap(), GlobalState::default());
        assert!(store.merkle_root().unwrap().is_zero());
        assert!(store.accounts().unwrap().is_empty());
        assert_eq!(store.commit_count().unwrap(), 0);
    }

    #[test]
    fn commit_roundtrips_every_column() {
        let (mut store, _dir) = temp_store();
        let mut cs = ChangeSet::default();
        cs.balances.insert(acct(1), 1_055);
        cs.accounts.insert(acct(1), sample_account());
        cs.globals = Some(GlobalState {
            forfeited_pool: 250,
            total_weighted_contribution: u128::from(u64::MAX) * 3,
        });
        cs.exempt.insert(acct(2), true);
        cs.merkle_claimed.insert(acct(3));
        cs.merkle_root = Some(Hash256([9; 32]));
        store.commit(cs).unwrap();

        assert_eq!(store.balance_of(&acct(1)).unwrap(), 1_055);
        assert_eq!(store.account(&acct(1)).unwrap(), Some(sample_account()));
        let g = store.globals().unwrap();
        assert_eq!(g.forfeited_pool, 250);
        assert_eq!(g.total_weighted_contribution, u128::from(u64::MAX) * 3);
        assert!(store.is_exempt(&acct(2)).unwrap());
        assert!(!store.is_exempt(&acct(1)).unwrap());
        assert!(store.merkle_claimed(&acct(3)).unwrap());
        assert_eq!(store.merkle_root().unwrap(), Hash256([9; 32]));
        assert_eq!(store.commit_count().unwrap(), 1);
    }

    #[test]
    fn zero_and_empty_entries_are_deleted() {
        let (mut store, _dir) = temp_store();
        let mut cs = ChangeSet::default();
        cs.balances.insert(acct(1), 10);
        cs.accounts.insert(acct(1), sample_account());
        cs.exempt.insert(acct(1), true);
        store.commit(cs).unwrap();

        let mut cs = ChangeSet::default();
        cs.balances.insert(acct(1), 0);
        cs.accounts.insert(acct(1), AccountVesting::default());
        cs.exempt.insert(acct(1), false);
        store.commit(cs).unwrap();

        assert_eq!(store.balance_of(&acct(1)).unwrap(), 0);
        assert_eq!(store.account(&acct(1)).unwrap(), None);
        assert!(!store.is_exempt(&acct(1)).unwrap());
        assert!(store.accounts().unwrap().is_empty());
    }

    #[test]
    fn accounts_lists_in_key_order() {
        let (mut store, _dir) = temp_store();
        let mut cs = ChangeSet::default();
        for seed in [5u8, 1, 3] {
            cs.accounts.insert(acct(seed), sample_account());
        }
        store.commit(cs).unwrap();
        let ids: Vec<AccountId> = store.accounts().unwrap().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![acct(1), acct(3), acct(5)]);
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vestingdata");
        {
            let mut store = RocksStore::open(&path).unwrap();
            let mut cs = ChangeSet::default();
            cs.balances.insert(acct(1), 77);
            cs.accounts.insert(acct(1), sample_account());
            cs.globals = Some(GlobalState {
                forfeited_pool: 5,
                total_weighted_contribution: 1_000_000_000_000_000_000_123,
            });
            store.commit(cs).unwrap();
            store.flush().unwrap();
        }
        let store = RocksStore::open(&path).unwrap();
        assert_eq!(store.balance_of(&acct(1)).unwrap(), 77);
        assert_eq!(store.account(&acct(1)).unwrap(), Some(sample_account()));
        assert_eq!(
            store.globals().unwrap().total_weighted_contribution,
            1_000_000_000_000_000_000_123
        );
        assert_eq!(store.commit_count().unwrap(), 1);
    }

    #[test]
    fn compact_succeeds() {
        let (store, _dir) = temp_store();
        store.compact().unwrap();
    }
}
