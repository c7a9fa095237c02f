use super::transaction::{Metadata, TransactionStatus, TransactionType};
use super::wallet::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    PayinTransaction,
    PayoutTransaction,
    TaxPayment,
    WalletCreated,
    WalletStatusChanged,
    TreasuryInitialized,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::PayinTransaction => "PAYIN_TRANSACTION",
            AuditAction::PayoutTransaction => "PAYOUT_TRANSACTION",
            AuditAction::TaxPayment => "TAX_PAYMENT",
            AuditAction::WalletCreated => "WALLET_CREATED",
            AuditAction::WalletStatusChanged => "WALLET_STATUS_CHANGED",
            AuditAction::TreasuryInitialized => "TREASURY_INITIALIZED",
        }
    }
}

impl From<TransactionType> for AuditAction {
    fn from(kind: TransactionType) -> Self {
        match kind {
            TransactionType::Payin => AuditAction::PayinTransaction,
            TransactionType::Payout => AuditAction::PayoutTransaction,
            TransactionType::Tax => AuditAction::TaxPayment,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Failed,
}

impl From<TransactionStatus> for AuditStatus {
    fn from(status: TransactionStatus) -> Self {
        match status {
            TransactionStatus::Success => AuditStatus::Success,
            _ => AuditStatus::Failed,
        }
    }
}

/// Where a request came from, as reported by the HTTP layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// One append-only audit record.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// `None` for system-level actions such as treasury initialization.
    pub user_id: Option<UserId>,
    pub action: AuditAction,
    pub resource: Option<String>,
    pub status: AuditStatus,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: Metadata,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, status: AuditStatus) -> Self {
        Self {
            user_id: None,
            action,
            resource: None,
            status,
            ip_address: None,
            user_agent: None,
            metadata: Metadata::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn context(mut self, context: &RequestContext) -> Self {
        self.ip_address = context.ip_address.clone();
        self.user_agent = context.user_agent.clone();
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_tags_follow_transaction_type() {
        assert_eq!(
            AuditAction::from(TransactionType::Payin).as_str(),
            "PAYIN_TRANSACTION"
        );
        assert_eq!(AuditAction::from(TransactionType::Tax).as_str(), "TAX_PAYMENT");
        assert_eq!(
            serde_json::to_string(&AuditAction::PayoutTransaction).unwrap(),
            "\"PAYOUT_TRANSACTION\""
        );
    }

    #[test]
    fn test_status_mirrors_transaction_outcome() {
        assert_eq!(
            AuditStatus::from(TransactionStatus::Success),
            AuditStatus::Success
        );
        assert_eq!(
            AuditStatus::from(TransactionStatus::Failed),
            AuditStatus::Failed
        );
    }

    #[test]
    fn test_builder_copies_request_context() {
        let context = RequestContext {
            ip_address: Some("10.0.0.1".to_string()),
            user_agent: Some("curl/8.0".to_string()),
        };
        let entry = AuditEntry::new(AuditAction::TaxPayment, AuditStatus::Success)
            .user(UserId::new("alice"))
            .resource("TXN-2026-000001")
            .context(&context);

        assert_eq!(entry.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(entry.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(entry.resource.as_deref(), Some("TXN-2026-000001"));
    }
}
