use crate::application::Stores;
use crate::domain::ports::{TransactionRepository, TreasuryRepository, WalletRepository};
use crate::domain::transaction::Transaction;
use crate::domain::treasury::Treasury;
use crate::domain::wallet::{UserId, Wallet};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for wallets, keyed by owning user.
///
/// Uses `Arc<RwLock<HashMap<UserId, Wallet>>>` to allow shared concurrent access.
/// Ideal for testing or short-lived runs where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryWalletRepository {
    wallets: Arc<RwLock<HashMap<UserId, Wallet>>>,
}

impl InMemoryWalletRepository {
    /// Creates a new, empty in-memory wallet store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletRepository for InMemoryWalletRepository {
    async fn insert(&self, wallet: Wallet) -> Result<()> {
        let mut wallets = self.wallets.write().await;
        if wallets
            .values()
            .any(|w| w.virtual_account_no == wallet.virtual_account_no)
        {
            return Err(GatewayError::DuplicateVirtualAccount(
                wallet.virtual_account_no,
            ));
        }
        match wallets.entry(wallet.user_id.clone()) {
            Entry::Occupied(_) => Err(GatewayError::WalletAlreadyExists(wallet.user_id)),
            Entry::Vacant(slot) => {
                slot.insert(wallet);
                Ok(())
            }
        }
    }

    async fn store(&self, wallet: Wallet) -> Result<()> {
        let mut wallets = self.wallets.write().await;
        wallets.insert(wallet.user_id.clone(), wallet);
        Ok(())
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<Wallet>> {
        let wallets = self.wallets.read().await;
        Ok(wallets.get(user_id).cloned())
    }

    async fn find_by_virtual_account(&self, virtual_account_no: &str) -> Result<Option<Wallet>> {
        let wallets = self.wallets.read().await;
        Ok(wallets
            .values()
            .find(|w| w.virtual_account_no == virtual_account_no)
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<Wallet>> {
        let wallets = self.wallets.read().await;
        Ok(wallets.values().cloned().collect())
    }
}

/// Holds the single treasury row, if it has been initialized.
#[derive(Default, Clone)]
pub struct InMemoryTreasuryRepository {
    treasury: Arc<RwLock<Option<Treasury>>>,
}

impl InMemoryTreasuryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TreasuryRepository for InMemoryTreasuryRepository {
    async fn get(&self) -> Result<Option<Treasury>> {
        Ok(self.treasury.read().await.clone())
    }

    async fn store(&self, treasury: Treasury) -> Result<()> {
        *self.treasury.write().await = Some(treasury);
        Ok(())
    }
}

/// A thread-safe in-memory transaction ledger keyed by transaction id.
///
/// `insert` behaves like a unique index: a second row with the same id is rejected.
#[derive(Default, Clone)]
pub struct InMemoryTransactionRepository {
    transactions: Arc<RwLock<HashMap<String, Transaction>>>,
}

impl InMemoryTransactionRepository {
    /// Creates a new, empty in-memory transaction store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn insert(&self, tx: Transaction) -> Result<()> {
        let mut transactions = self.transactions.write().await;
        match transactions.entry(tx.txn_id.clone()) {
            Entry::Occupied(_) => Err(GatewayError::DuplicateTransaction(tx.txn_id)),
            Entry::Vacant(slot) => {
                slot.insert(tx);
                Ok(())
            }
        }
    }

    async fn update(&self, tx: Transaction) -> Result<()> {
        let mut transactions = self.transactions.write().await;
        match transactions.get_mut(&tx.txn_id) {
            Some(existing) => {
                *existing = tx;
                Ok(())
            }
            None => Err(GatewayError::NotFound(tx.txn_id)),
        }
    }

    async fn get(&self, txn_id: &str) -> Result<Option<Transaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(txn_id).cloned())
    }

    async fn exists(&self, txn_id: &str) -> Result<bool> {
        let transactions = self.transactions.read().await;
        Ok(transactions.contains_key(txn_id))
    }

    async fn get_all(&self) -> Result<Vec<Transaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions.values().cloned().collect())
    }
}

/// A fresh, empty set of in-memory stores.
pub fn in_memory_stores() -> Stores {
    Stores {
        wallets: Arc::new(InMemoryWalletRepository::new()),
        treasury: Arc::new(InMemoryTreasuryRepository::new()),
        transactions: Arc::new(InMemoryTransactionRepository::new()),
    }
}
