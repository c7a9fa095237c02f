use super::audit::AuditEntry;
use super::transaction::{Transaction, TransactionType};
use super::treasury::Treasury;
use super::wallet::{UserId, Wallet};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Inserts a brand-new wallet. Fails if the user already has one.
    async fn insert(&self, wallet: Wallet) -> Result<()>;
    /// Overwrites an existing wallet.
    async fn store(&self, wallet: Wallet) -> Result<()>;
    async fn get(&self, user_id: &UserId) -> Result<Option<Wallet>>;
    async fn find_by_virtual_account(&self, virtual_account_no: &str) -> Result<Option<Wallet>>;
    async fn get_all(&self) -> Result<Vec<Wallet>>;
}

#[async_trait]
pub trait TreasuryRepository: Send + Sync {
    async fn get(&self) -> Result<Option<Treasury>>;
    async fn store(&self, treasury: Treasury) -> Result<()>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Inserts a new row. Fails with `DuplicateTransaction` if the id is taken.
    async fn insert(&self, tx: Transaction) -> Result<()>;
    /// Overwrites an existing row. Fails with `NotFound` if it was never inserted.
    async fn update(&self, tx: Transaction) -> Result<()>;
    async fn get(&self, txn_id: &str) -> Result<Option<Transaction>>;
    async fn exists(&self, txn_id: &str) -> Result<bool>;
    async fn get_all(&self) -> Result<Vec<Transaction>>;
}

/// What the external rail answered for one settlement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementOutcome {
    pub delay: Duration,
    pub success: bool,
}

/// Models the external rail: how long settlement takes and whether it succeeds.
#[async_trait]
pub trait SettlementSimulator: Send + Sync {
    async fn run(&self, kind: TransactionType) -> SettlementOutcome;
}

/// Receives the audit trail. Callers treat failures as non-fatal.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> Result<()>;
}

pub type WalletRepositoryRef = Arc<dyn WalletRepository>;
pub type TreasuryRepositoryRef = Arc<dyn TreasuryRepository>;
pub type TransactionRepositoryRef = Arc<dyn TransactionRepository>;
pub type SettlementSimulatorRef = Arc<dyn SettlementSimulator>;
pub type AuditSinkRef = Arc<dyn AuditSink>;
