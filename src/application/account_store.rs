use crate::domain::money::Amount;
use crate::domain::ports::{TreasuryRepositoryRef, WalletRepositoryRef};
use crate::domain::treasury::Treasury;
use crate::domain::wallet::{UserId, Wallet, WalletStatus};
use crate::error::{GatewayError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::error;

/// Lock key for one account. Variant order is the acquisition order when an
/// operation needs more than one account: wallets first, then the treasury.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccountKey {
    Wallet(UserId),
    Treasury,
}

/// One async mutex per account, created on first use.
#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<AccountKey, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    /// Waits for exclusive access to `key`. The lock is held until the guard drops.
    pub async fn lock(&self, key: AccountKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(key).or_default())
        };
        lock.lock_owned().await
    }
}

/// Owns every balance in the system: one wallet per user and the treasury.
///
/// Each read-modify-write runs under the per-account lock, so concurrent
/// debits against one wallet are applied one after another and the second
/// sees the first one's result.
pub struct AccountStore {
    wallets: WalletRepositoryRef,
    treasury: TreasuryRepositoryRef,
    locks: KeyedLocks,
}

impl AccountStore {
    /// Creates a new `AccountStore`.
    ///
    /// # Arguments
    ///
    /// * `wallets` - The wallet repository port.
    /// * `treasury` - The treasury repository port.
    pub fn new(wallets: WalletRepositoryRef, treasury: TreasuryRepositoryRef) -> Self {
        Self {
            wallets,
            treasury,
            locks: KeyedLocks::default(),
        }
    }

    /// Returns the wallet for `user_id`, if one was opened.
    pub async fn get_wallet(&self, user_id: &UserId) -> Result<Option<Wallet>> {
        self.wallets.get(user_id).await
    }

    /// Like `get_wallet`, but a missing wallet is an error.
    pub async fn wallet(&self, user_id: &UserId) -> Result<Wallet> {
        self.wallets
            .get(user_id)
            .await?
            .ok_or_else(|| GatewayError::WalletNotFound(user_id.clone()))
    }

    /// Reverse lookup by virtual account number.
    pub async fn find_by_virtual_account(&self, virtual_account_no: &str) -> Result<Option<Wallet>> {
        self.wallets.find_by_virtual_account(virtual_account_no).await
    }

    /// Every stored wallet.
    pub async fn all_wallets(&self) -> Result<Vec<Wallet>> {
        self.wallets.get_all().await
    }

    /// Whether any wallet already uses `virtual_account_no`.
    pub async fn virtual_account_taken(&self, virtual_account_no: &str) -> Result<bool> {
        Ok(self
            .wallets
            .find_by_virtual_account(virtual_account_no)
            .await?
            .is_some())
    }

    /// Inserts a new wallet. Fails with `WalletAlreadyExists` for a user that
    /// has one and `DuplicateVirtualAccount` when the number is taken.
    pub async fn open_wallet(&self, wallet: Wallet) -> Result<Wallet> {
        let _guard = self
            .locks
            .lock(AccountKey::Wallet(wallet.user_id.clone()))
            .await;
        if self.wallets.get(&wallet.user_id).await?.is_some() {
            return Err(GatewayError::WalletAlreadyExists(wallet.user_id));
        }
        self.wallets.insert(wallet.clone()).await?;
        Ok(wallet)
    }

    /// Changes the wallet status under its lock.
    pub async fn set_wallet_status(&self, user_id: &UserId, status: WalletStatus) -> Result<Wallet> {
        let _guard = self.locks.lock(AccountKey::Wallet(user_id.clone())).await;
        let mut wallet = self.wallet(user_id).await?;
        wallet.set_status(status);
        self.wallets.store(wallet.clone()).await?;
        Ok(wallet)
    }

    /// Increases the wallet balance by `amount`. Suspended wallets refuse.
    pub async fn credit(&self, user_id: &UserId, amount: Amount) -> Result<Wallet> {
        let _guard = self.locks.lock(AccountKey::Wallet(user_id.clone())).await;
        let mut wallet = self.wallet(user_id).await?;
        wallet.credit(amount)?;
        self.wallets.store(wallet.clone()).await?;
        Ok(wallet)
    }

    /// Fails with `InsufficientBalance` when the balance at the moment of the
    /// debit, not at the moment of any earlier check, cannot cover `amount`.
    pub async fn debit(&self, user_id: &UserId, amount: Amount) -> Result<Wallet> {
        let _guard = self.locks.lock(AccountKey::Wallet(user_id.clone())).await;
        let mut wallet = self.wallet(user_id).await?;
        wallet.debit(amount)?;
        self.wallets.store(wallet.clone()).await?;
        Ok(wallet)
    }

    /// Current treasury snapshot; `None` before `initialize_treasury`.
    pub async fn treasury(&self) -> Result<Option<Treasury>> {
        self.treasury.get().await
    }

    /// Creates the treasury row if it is missing. Returns whether it was created.
    pub async fn initialize_treasury(&self) -> Result<bool> {
        let _guard = self.locks.lock(AccountKey::Treasury).await;
        if self.treasury.get().await?.is_some() {
            return Ok(false);
        }
        self.treasury.store(Treasury::new()).await?;
        Ok(true)
    }

    /// Adds `amount` to the treasury balance and to `total_collected`.
    ///
    /// # Arguments
    ///
    /// * `amount` - The receipt to credit.
    ///
    /// Fails with `TreasuryNotInitialized` when the singleton row is missing.
    pub async fn add_to_treasury(&self, amount: Amount) -> Result<Treasury> {
        let _guard = self.locks.lock(AccountKey::Treasury).await;
        self.credit_treasury(amount).await
    }

    /// Moves `amount` from a wallet into the treasury while holding both locks.
    ///
    /// The treasury side is the same credit `add_to_treasury` performs. If it
    /// fails after the wallet was debited, the wallet is written back to its
    /// previous state before the error is returned; a failed write-back is a
    /// `LedgerInconsistency` on `wallet:<user>`.
    pub async fn transfer_to_treasury(
        &self,
        user_id: &UserId,
        amount: Amount,
    ) -> Result<(Wallet, Treasury)> {
        let _wallet_guard = self.locks.lock(AccountKey::Wallet(user_id.clone())).await;
        let _treasury_guard = self.locks.lock(AccountKey::Treasury).await;

        let original = self.wallet(user_id).await?;
        let mut wallet = original.clone();
        wallet.debit(amount)?;
        self.wallets.store(wallet.clone()).await?;

        match self.credit_treasury(amount).await {
            Ok(treasury) => Ok((wallet, treasury)),
            Err(e) => match self.wallets.store(original).await {
                Ok(()) => Err(e),
                Err(restore) => {
                    error!(
                        target: "reconciliation",
                        user = %user_id,
                        amount = %amount,
                        treasury_error = %e,
                        restore_error = %restore,
                        "wallet debited but treasury credit and wallet restore both failed"
                    );
                    Err(GatewayError::LedgerInconsistency {
                        reference: format!("wallet:{}", user_id),
                        reason: format!(
                            "treasury write failed ({}), wallet restore failed ({})",
                            e, restore
                        ),
                    })
                }
            },
        }
    }

    /// Caller holds the treasury lock.
    async fn credit_treasury(&self, amount: Amount) -> Result<Treasury> {
        let mut treasury = self.load_treasury().await?;
        treasury.collect(amount);
        self.treasury.store(treasury.clone()).await?;
        Ok(treasury)
    }

    async fn load_treasury(&self) -> Result<Treasury> {
        self.treasury
            .get()
            .await?
            .ok_or(GatewayError::TreasuryNotInitialized)
    }
}
