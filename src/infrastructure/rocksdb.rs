use crate::application::Stores;
use crate::domain::ports::{TransactionRepository, TreasuryRepository, WalletRepository};
use crate::domain::transaction::Transaction;
use crate::domain::treasury::Treasury;
use crate::domain::wallet::{UserId, Wallet};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Column Family for wallets, keyed by user id.
pub const CF_WALLETS: &str = "wallets";
/// Column Family holding the single treasury row.
pub const CF_TREASURY: &str = "treasury";
/// Column Family for the transaction ledger, keyed by transaction id.
pub const CF_TRANSACTIONS: &str = "transactions";

const TREASURY_KEY: &[u8] = b"treasury";

/// A persistent store implementation using RocksDB.
///
/// Wallets, the treasury and transactions live in separate Column Families
/// and are stored as JSON. `Clone` shares the underlying `Arc<DB>`.
///
/// RocksDB has no unique-insert primitive, so `insert` checks and writes
/// under `insert_lock`. Updates to existing rows do not take it.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    insert_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at `path`, creating any missing
    /// column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_WALLETS, CF_TREASURY, CF_TRANSACTIONS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            insert_lock: Arc::new(Mutex::new(())),
        })
    }

    /// All three ports backed by this database.
    pub fn stores(&self) -> Stores {
        Stores {
            wallets: Arc::new(self.clone()),
            treasury: Arc::new(self.clone()),
            transactions: Arc::new(self.clone()),
        }
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| GatewayError::Storage(format!("{} column family not found", name)))
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(cf, key, bytes)?;
        Ok(())
    }

    fn contains(&self, cf_name: &str, key: &[u8]) -> Result<bool> {
        let cf = self.cf(cf_name)?;
        Ok(self.db.get_pinned_cf(cf, key)?.is_some())
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }

    fn wallet_by_virtual_account(&self, virtual_account_no: &str) -> Result<Option<Wallet>> {
        Ok(self
            .scan::<Wallet>(CF_WALLETS)?
            .into_iter()
            .find(|w| w.virtual_account_no == virtual_account_no))
    }

    fn insert_guard(&self) -> std::sync::MutexGuard<'_, ()> {
        match self.insert_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl WalletRepository for RocksDBStore {
    async fn insert(&self, wallet: Wallet) -> Result<()> {
        let _guard = self.insert_guard();
        let key = wallet.user_id.as_str().as_bytes();
        if self.contains(CF_WALLETS, key)? {
            return Err(GatewayError::WalletAlreadyExists(wallet.user_id));
        }
        if self
            .wallet_by_virtual_account(&wallet.virtual_account_no)?
            .is_some()
        {
            return Err(GatewayError::DuplicateVirtualAccount(
                wallet.virtual_account_no,
            ));
        }
        self.write(CF_WALLETS, key, &wallet)
    }

    async fn store(&self, wallet: Wallet) -> Result<()> {
        self.write(CF_WALLETS, wallet.user_id.as_str().as_bytes(), &wallet)
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<Wallet>> {
        self.read(CF_WALLETS, user_id.as_str().as_bytes())
    }

    async fn find_by_virtual_account(&self, virtual_account_no: &str) -> Result<Option<Wallet>> {
        self.wallet_by_virtual_account(virtual_account_no)
    }

    async fn get_all(&self) -> Result<Vec<Wallet>> {
        self.scan(CF_WALLETS)
    }
}

#[async_trait]
impl TreasuryRepository for RocksDBStore {
    async fn get(&self) -> Result<Option<Treasury>> {
        self.read(CF_TREASURY, TREASURY_KEY)
    }

    async fn store(&self, treasury: Treasury) -> Result<()> {
        self.write(CF_TREASURY, TREASURY_KEY, &treasury)
    }
}

#[async_trait]
impl TransactionRepository for RocksDBStore {
    async fn insert(&self, tx: Transaction) -> Result<()> {
        let _guard = self.insert_guard();
        let key = tx.txn_id.as_bytes();
        if self.contains(CF_TRANSACTIONS, key)? {
            return Err(GatewayError::DuplicateTransaction(tx.txn_id));
        }
        self.write(CF_TRANSACTIONS, key, &tx)
    }

    async fn update(&self, tx: Transaction) -> Result<()> {
        let key = tx.txn_id.as_bytes();
        if !self.contains(CF_TRANSACTIONS, key)? {
            return Err(GatewayError::NotFound(tx.txn_id));
        }
        self.write(CF_TRANSACTIONS, key, &tx)
    }

    async fn get(&self, txn_id: &str) -> Result<Option<Transaction>> {
        self.read(CF_TRANSACTIONS, txn_id.as_bytes())
    }

    async fn exists(&self, txn_id: &str) -> Result<bool> {
        self.contains(CF_TRANSACTIONS, txn_id.as_bytes())
    }

    async fn get_all(&self) -> Result<Vec<Transaction>> {
        self.scan(CF_TRANSACTIONS)
    }
}
