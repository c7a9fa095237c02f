use super::account_store::AccountStore;
use super::audit::AuditTrail;
use super::ids::{IdGenerator, VIRTUAL_ACCOUNT_PREFIX};
use super::ledger::TransactionLedger;
use crate::domain::audit::{AuditAction, AuditEntry, AuditStatus};
use crate::domain::transaction::{Metadata, Transaction};
use crate::domain::wallet::{UserId, Wallet, WalletStatus};
use crate::error::{GatewayError, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Wallet provisioning and read access, used by the account-provisioning
/// collaborator and the wallet views.
pub struct WalletService {
    accounts: Arc<AccountStore>,
    ledger: Arc<TransactionLedger>,
    ids: IdGenerator,
    audit: AuditTrail,
    history_limit: usize,
}

impl WalletService {
    /// Creates a new `WalletService`.
    ///
    /// # Arguments
    ///
    /// * `accounts` - The account store that owns wallets.
    /// * `ledger` - Source of transaction history.
    /// * `ids` - Generator for `VA-` numbers.
    /// * `audit` - Receives wallet lifecycle entries.
    /// * `history_limit` - Page size when the caller gives none.
    pub fn new(
        accounts: Arc<AccountStore>,
        ledger: Arc<TransactionLedger>,
        ids: IdGenerator,
        audit: AuditTrail,
        history_limit: usize,
    ) -> Self {
        Self {
            accounts,
            ledger,
            ids,
            audit,
            history_limit,
        }
    }

    /// Opens the zero-balance wallet for a newly registered user.
    pub async fn create_wallet(&self, user_id: &UserId) -> Result<Wallet> {
        let wallet = self.open_with_fresh_account(user_id).await?;
        info!(user = %user_id, virtual_account = %wallet.virtual_account_no, "wallet created");

        let mut metadata = Metadata::new();
        metadata.insert(
            "virtualAccountNo".to_string(),
            Value::String(wallet.virtual_account_no.clone()),
        );
        self.audit
            .log(
                AuditEntry::new(AuditAction::WalletCreated, AuditStatus::Success)
                    .user(user_id.clone())
                    .resource(wallet.virtual_account_no.clone())
                    .metadata(metadata),
            )
            .await;

        Ok(wallet)
    }

    /// A concurrent registration can claim the same number between the
    /// availability check and the insert; the loser draws again.
    async fn open_with_fresh_account(&self, user_id: &UserId) -> Result<Wallet> {
        let accounts = &self.accounts;
        for _ in 0..self.ids.max_attempts() {
            let virtual_account_no = self
                .ids
                .unique(VIRTUAL_ACCOUNT_PREFIX, |candidate| async move {
                    accounts.virtual_account_taken(&candidate).await
                })
                .await?;

            match accounts
                .open_wallet(Wallet::new(user_id.clone(), virtual_account_no))
                .await
            {
                Err(GatewayError::DuplicateVirtualAccount(taken)) => {
                    warn!(virtual_account = %taken, "virtual account claimed concurrently, regenerating");
                }
                result => return result,
            }
        }

        Err(GatewayError::GenerationExhausted {
            prefix: VIRTUAL_ACCOUNT_PREFIX.to_string(),
            attempts: self.ids.max_attempts(),
        })
    }

    /// The user's wallet, if one was created.
    pub async fn get_wallet(&self, user_id: &UserId) -> Result<Option<Wallet>> {
        self.accounts.get_wallet(user_id).await
    }

    /// Reverse lookup by virtual account number.
    pub async fn find_by_virtual_account(&self, virtual_account_no: &str) -> Result<Option<Wallet>> {
        self.accounts.find_by_virtual_account(virtual_account_no).await
    }

    /// Every wallet, in no particular order.
    pub async fn all_wallets(&self) -> Result<Vec<Wallet>> {
        self.accounts.all_wallets().await
    }

    /// Newest first. `None` falls back to the configured page size.
    pub async fn get_transaction_history(
        &self,
        user_id: &UserId,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>> {
        if self.accounts.get_wallet(user_id).await?.is_none() {
            return Err(GatewayError::WalletNotFound(user_id.clone()));
        }
        self.ledger
            .history(user_id, limit.unwrap_or(self.history_limit))
            .await
    }

    /// Blocks pay-ins, payouts and tax payments until `activate`.
    pub async fn suspend(&self, user_id: &UserId) -> Result<Wallet> {
        self.change_status(user_id, WalletStatus::Suspended).await
    }

    /// Lifts a suspension.
    pub async fn activate(&self, user_id: &UserId) -> Result<Wallet> {
        self.change_status(user_id, WalletStatus::Active).await
    }

    async fn change_status(&self, user_id: &UserId, status: WalletStatus) -> Result<Wallet> {
        let wallet = self.accounts.set_wallet_status(user_id, status).await?;
        info!(user = %user_id, %status, "wallet status changed");

        let mut metadata = Metadata::new();
        metadata.insert("status".to_string(), Value::String(status.to_string()));
        self.audit
            .log(
                AuditEntry::new(AuditAction::WalletStatusChanged, AuditStatus::Success)
                    .user(user_id.clone())
                    .resource(wallet.virtual_account_no.clone())
                    .metadata(metadata),
            )
            .await;

        Ok(wallet)
    }
}
