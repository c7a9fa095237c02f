use crate::domain::audit::{AuditAction, AuditEntry};
use crate::domain::ports::AuditSink;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Writes every audit entry as a structured event under the `audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        info!(
            target: "audit",
            action = %entry.action,
            user = entry.user_id.as_ref().map(|u| u.as_str()).unwrap_or("system"),
            resource = entry.resource.as_deref().unwrap_or(""),
            status = ?entry.status,
            ip = entry.ip_address.as_deref().unwrap_or(""),
            metadata = %serde_json::Value::Object(entry.metadata.clone()),
            "audit"
        );
        Ok(())
    }
}

/// Append-only audit log kept in memory, queryable newest-first.
#[derive(Default, Clone)]
pub struct InMemoryAuditLog {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries in the order they were recorded.
    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }

    /// Newest entries first, optionally restricted to one action.
    pub async fn query(&self, action: Option<AuditAction>, limit: usize) -> Vec<AuditEntry> {
        self.entries
            .read()
            .await
            .iter()
            .rev()
            .filter(|e| action.is_none_or(|a| a == e.action))
            .take(limit)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audit::AuditStatus;
    use crate::domain::wallet::UserId;

    #[tokio::test]
    async fn test_query_newest_first_by_action() {
        let log = InMemoryAuditLog::new();
        for resource in ["TXN-2026-000001", "TXN-2026-000002"] {
            log.record(
                AuditEntry::new(AuditAction::TaxPayment, AuditStatus::Success)
                    .user(UserId::new("alice"))
                    .resource(resource),
            )
            .await
            .unwrap();
        }
        log.record(AuditEntry::new(
            AuditAction::TreasuryInitialized,
            AuditStatus::Success,
        ))
        .await
        .unwrap();

        let taxes = log.query(Some(AuditAction::TaxPayment), 10).await;
        assert_eq!(taxes.len(), 2);
        assert_eq!(taxes[0].resource.as_deref(), Some("TXN-2026-000002"));

        let latest = log.query(None, 1).await;
        assert_eq!(latest[0].action, AuditAction::TreasuryInitialized);
        assert!(latest[0].user_id.is_none());
    }

    #[tokio::test]
    async fn test_tracing_sink_accepts_entries() {
        let sink = TracingAuditSink;
        let entry = AuditEntry::new(AuditAction::WalletCreated, AuditStatus::Success);
        assert!(sink.record(entry).await.is_ok());
    }
}
