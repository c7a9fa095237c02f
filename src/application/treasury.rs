use super::account_store::AccountStore;
use super::audit::AuditTrail;
use crate::domain::audit::{AuditAction, AuditEntry, AuditStatus};
use crate::domain::money::Amount;
use crate::domain::treasury::Treasury;
use crate::error::{GatewayError, Result};
use std::sync::Arc;
use tracing::{error, info};

/// Lifecycle and read access for the treasury singleton.
pub struct TreasuryService {
    accounts: Arc<AccountStore>,
    audit: AuditTrail,
}

impl TreasuryService {
    /// Creates a new `TreasuryService`.
    ///
    /// # Arguments
    ///
    /// * `accounts` - The account store that owns the treasury row.
    /// * `audit` - Where initialization is recorded.
    pub fn new(accounts: Arc<AccountStore>, audit: AuditTrail) -> Self {
        Self { accounts, audit }
    }

    /// Safe to call on every process start; only the first call creates the row.
    pub async fn initialize_treasury(&self) -> Result<()> {
        if self.accounts.initialize_treasury().await? {
            info!("treasury account initialized");
            self.audit
                .log(
                    AuditEntry::new(AuditAction::TreasuryInitialized, AuditStatus::Success)
                        .resource(crate::domain::treasury::TREASURY_ACCOUNT_TYPE),
                )
                .await;
        }
        Ok(())
    }

    /// Credits a tax receipt outside a wallet transfer.
    ///
    /// This is the same locked credit that tax settlement applies through
    /// `AccountStore::transfer_to_treasury`. A missing treasury here means
    /// startup never ran `initialize_treasury`, so it is reported as an
    /// invariant violation.
    pub async fn add_funds(&self, amount: Amount) -> Result<Treasury> {
        self.accounts.add_to_treasury(amount).await.inspect_err(|e| {
            if let GatewayError::TreasuryNotInitialized = e {
                error!(target: "reconciliation", amount = %amount, "treasury missing while adding funds");
            }
        })
    }

    /// Read-only snapshot of the treasury row.
    pub async fn get_stats(&self) -> Result<Treasury> {
        self.accounts
            .treasury()
            .await?
            .ok_or(GatewayError::TreasuryNotInitialized)
    }
}
