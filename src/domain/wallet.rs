use super::money::{Amount, Balance};
use crate::error::GatewayError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a user owned by the external account-provisioning system.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    Active,
    Suspended,
}

impl fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletStatus::Active => f.write_str("active"),
            WalletStatus::Suspended => f.write_str("suspended"),
        }
    }
}

/// A user's stored balance in the internal ledger.
///
/// Exactly one wallet exists per user. It is created when the user registers
/// and is never deleted.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Wallet {
    pub user_id: UserId,
    /// Synthetic `VA-<year>-<6 digits>` identifier, unrelated to any real bank account.
    pub virtual_account_no: String,
    pub balance: Balance,
    pub status: WalletStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// A zero-balance, active wallet.
    pub fn new(user_id: UserId, virtual_account_no: String) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            virtual_account_no,
            balance: Balance::ZERO,
            status: WalletStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == WalletStatus::Active
    }

    /// Fails with `WalletSuspended` unless the wallet is active.
    pub fn ensure_active(&self) -> Result<(), GatewayError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(GatewayError::WalletSuspended(self.user_id.clone()))
        }
    }

    pub fn credit(&mut self, amount: Amount) -> Result<(), GatewayError> {
        self.ensure_active()?;
        self.balance.credit(amount);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Fails with `WalletSuspended` or, when the balance cannot cover
    /// `amount`, `InsufficientBalance`.
    pub fn debit(&mut self, amount: Amount) -> Result<(), GatewayError> {
        self.ensure_active()?;
        self.balance = self.balance.checked_debit(amount).ok_or(
            GatewayError::InsufficientBalance {
                available: self.balance,
                requested: amount.into(),
            },
        )?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_status(&mut self, status: WalletStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
