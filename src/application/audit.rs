use crate::domain::audit::AuditEntry;
use crate::domain::ports::AuditSinkRef;
use std::time::Duration;
use tracing::warn;

/// Best-effort front for an [`AuditSink`](crate::domain::ports::AuditSink).
///
/// Sink errors and timeouts are logged and dropped; they never reach the
/// operation that produced the entry.
#[derive(Clone)]
pub struct AuditTrail {
    sink: AuditSinkRef,
    timeout: Duration,
}

impl AuditTrail {
    /// Creates a new `AuditTrail`.
    ///
    /// # Arguments
    ///
    /// * `sink` - The audit sink port.
    /// * `timeout` - How long one write may take before it is abandoned.
    pub fn new(sink: AuditSinkRef, timeout: Duration) -> Self {
        Self { sink, timeout }
    }

    /// Writes `entry`. Failures and timeouts are logged, never returned.
    pub async fn log(&self, entry: AuditEntry) {
        let action = entry.action;
        let resource = entry.resource.clone().unwrap_or_default();
        match tokio::time::timeout(self.timeout, self.sink.record(entry)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(%action, resource = %resource, error = %e, "audit logging failed");
            }
            Err(_) => {
                warn!(%action, resource = %resource, timeout_ms = self.timeout.as_millis() as u64, "audit logging timed out");
            }
        }
    }
}
