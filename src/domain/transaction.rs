use super::money::Amount;
use super::wallet::UserId;
use crate::error::GatewayError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Free-form, JSON-shaped data attached to a transaction (gateway references,
/// failure reason, receipt id).
pub type Metadata = serde_json::Map<String, Value>;

pub const META_FAILURE_REASON: &str = "failureReason";
pub const META_ERROR: &str = "error";
pub const META_RECEIPT_ID: &str = "receiptId";
pub const META_TAX_TYPE: &str = "taxType";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Payin,
    Payout,
    Tax,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Payin => "PAYIN",
            TransactionType::Payout => "PAYOUT",
            TransactionType::Tax => "TAX",
        }
    }

    /// Payouts and tax payments draw on the wallet and need funds up front.
    pub fn debits_wallet(&self) -> bool {
        matches!(self, TransactionType::Payout | TransactionType::Tax)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `PENDING` is the only non-terminal state; nothing leaves `SUCCESS` or `FAILED`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Success => "SUCCESS",
            TransactionStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the ledger needs to open a PENDING row, minus the identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub user_id: UserId,
    pub r#type: TransactionType,
    pub amount: Amount,
    pub from_account: String,
    pub to_account: String,
    pub metadata: Metadata,
}

/// One attempted money movement.
///
/// Rows are never deleted. Once terminal, only metadata written in the same
/// transition as the terminal status is ever added.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub txn_id: String,
    pub user_id: UserId,
    pub r#type: TransactionType,
    pub amount: Amount,
    pub status: TransactionStatus,
    pub from_account: String,
    pub to_account: String,
    pub metadata: Metadata,
    /// Elapsed milliseconds from PENDING creation to the terminal state.
    pub processing_time: Option<u64>,
    /// Set only on terminal success.
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// A new PENDING row stamped with the current time.
    pub fn pending(txn_id: String, draft: NewTransaction) -> Self {
        let now = Utc::now();
        Self {
            txn_id,
            user_id: draft.user_id,
            r#type: draft.r#type,
            amount: draft.amount,
            status: TransactionStatus::Pending,
            from_account: draft.from_account,
            to_account: draft.to_account,
            metadata: draft.metadata,
            processing_time: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn ensure_pending(&self) -> Result<(), GatewayError> {
        if self.is_terminal() {
            return Err(GatewayError::InvalidTransition {
                txn_id: self.txn_id.clone(),
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    /// PENDING -> SUCCESS, merging any metadata produced by settlement.
    pub fn succeed(&mut self, extra: Metadata) -> Result<(), GatewayError> {
        self.ensure_pending()?;
        let now = Utc::now();
        self.metadata.extend(extra);
        self.status = TransactionStatus::Success;
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// PENDING -> FAILED, recording the reason under `key`.
    pub fn fail(&mut self, key: &str, reason: impl Into<String>) -> Result<(), GatewayError> {
        self.ensure_pending()?;
        self.metadata
            .insert(key.to_string(), Value::String(reason.into()));
        self.status = TransactionStatus::Failed;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}
