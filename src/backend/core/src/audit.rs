//! Access auditing: who touched what, when, and under which rule.
//!
//! Two delivery paths with different guarantees:
//!
//! - Sensitive events (writes, exports, administrative actions, logins) are
//!   appended synchronously. A failed append fails the triggering operation;
//!   a sensitive action without its audit record must not happen.
//! - Routine reads go through a bounded queue drained by a background task.
//!   Under backpressure entries are dropped with a warning; read volume must
//!   never be able to stall the read path.

use chrono::{DateTime, Utc};
use metrics::counter;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Result, WardenError};
use crate::rbac::models::UserId;
use crate::rls::engine::ScopeRule;

// ═══════════════════════════════════════════════════════════════════════════════
// Entry Model
// ═══════════════════════════════════════════════════════════════════════════════

/// Category of audited access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    /// Single-row or small read.
    Read,
    /// A filtered query over an entity.
    Query,
    /// Data mutation.
    Write,
    /// Bulk extraction.
    Export,
    /// Administrative action (grants, deactivations).
    Admin,
    /// Authentication event.
    Login,
}

impl AccessType {
    /// Sensitive events take the synchronous, durable path.
    pub const fn is_sensitive(&self) -> bool {
        matches!(self, Self::Write | Self::Export | Self::Admin | Self::Login)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Query => "query",
            Self::Write => "write",
            Self::Export => "export",
            Self::Admin => "admin",
            Self::Login => "login",
        }
    }
}

/// Client attribution captured from the transport layer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// One audit record.
///
/// Field names are part of the persisted format; renaming them is a breaking
/// change for downstream consumers.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// Acting user; `None` for system processes.
    pub user_id: Option<UserId>,
    /// Username, or process name for system identities.
    pub username: String,
    pub access_type: AccessType,
    /// Entity or surface that was accessed.
    pub resource: String,
    /// The query or operation detail, if the caller captured one.
    pub query: Option<String>,
    /// Rows returned to the caller after filtering.
    pub row_count: Option<u64>,
    pub session_id: Option<String>,
    pub client: ClientInfo,
    /// The scope rule that granted visibility, when one applies.
    pub rule: Option<ScopeRule>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        username: impl Into<String>,
        access_type: AccessType,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            user_id: None,
            username: username.into(),
            access_type,
            resource: resource.into(),
            query: None,
            row_count: None,
            session_id: None,
            client: ClientInfo::default(),
            rule: None,
            timestamp: Utc::now(),
        }
    }

    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn row_count(mut self, count: u64) -> Self {
        self.row_count = Some(count);
        self
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn client(mut self, client: ClientInfo) -> Self {
        self.client = client;
        self
    }

    pub fn rule(mut self, rule: ScopeRule) -> Self {
        self.rule = Some(rule);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Sinks
// ═══════════════════════════════════════════════════════════════════════════════

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    /// Durably append one entry.
    fn append(&self, entry: &AuditEntry) -> Result<()>;
}

/// In-memory sink for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: RwLock<Vec<AuditEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl AuditSink for MemorySink {
    fn append(&self, entry: &AuditEntry) -> Result<()> {
        self.entries.write().push(entry.clone());
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Logger
// ═══════════════════════════════════════════════════════════════════════════════

/// Front door for recording audit events.
#[derive(Clone)]
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
    routine_tx: mpsc::Sender<AuditEntry>,
}

impl AuditLogger {
    /// Create the logger and spawn the routine-queue drain task.
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn(sink: Arc<dyn AuditSink>, queue_capacity: usize) -> Self {
        let (routine_tx, mut routine_rx) = mpsc::channel::<AuditEntry>(queue_capacity);

        let drain_sink = sink.clone();
        tokio::spawn(async move {
            while let Some(entry) = routine_rx.recv().await {
                if let Err(err) = drain_sink.append(&entry) {
                    // Routine entries are best-effort; log and move on.
                    counter!("warden_audit_dropped_total", "reason" => "sink_error")
                        .increment(1);
                    warn!(error = %err, "routine audit append failed");
                }
            }
            debug!("audit drain task stopped");
        });

        Self { sink, routine_tx }
    }

    /// Record an event, choosing the path by sensitivity.
    pub fn record(&self, entry: AuditEntry) -> Result<()> {
        if entry.access_type.is_sensitive() {
            self.record_sensitive(entry)
        } else {
            self.record_routine(entry);
            Ok(())
        }
    }

    /// Synchronous, durable append. An error here must abort the operation
    /// that produced the entry.
    pub fn record_sensitive(&self, entry: AuditEntry) -> Result<()> {
        counter!("warden_audit_events_total", "path" => "sensitive").increment(1);
        self.sink
            .append(&entry)
            .map_err(|err| WardenError::AuditFailed(err.to_string()))
    }

    /// Best-effort enqueue. Dropped with a warning when the queue is full.
    pub fn record_routine(&self, entry: AuditEntry) {
        counter!("warden_audit_events_total", "path" => "routine").increment(1);
        if let Err(mpsc::error::TrySendError::Full(entry)) = self.routine_tx.try_send(entry) {
            counter!("warden_audit_dropped_total", "reason" => "backpressure").increment(1);
            warn!(
                username = %entry.username,
                resource = %entry.resource,
                "routine audit queue full; entry dropped"
            );
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink that always fails, standing in for an unreachable store.
    struct FailingSink;

    impl AuditSink for FailingSink {
        fn append(&self, _entry: &AuditEntry) -> Result<()> {
            Err(WardenError::Internal("sink unavailable".into()))
        }
    }

    #[test]
    fn test_sensitivity_classification() {
        assert!(AccessType::Write.is_sensitive());
        assert!(AccessType::Export.is_sensitive());
        assert!(AccessType::Admin.is_sensitive());
        assert!(AccessType::Login.is_sensitive());
        assert!(!AccessType::Read.is_sensitive());
        assert!(!AccessType::Query.is_sensitive());
    }

    #[tokio::test]
    async fn test_sensitive_append_is_immediate() {
        let sink = Arc::new(MemorySink::new());
        let logger = AuditLogger::spawn(sink.clone(), 16);

        logger
            .record(
                AuditEntry::new("alice", AccessType::Write, "sales")
                    .user(UserId::new())
                    .row_count(1),
            )
            .unwrap();

        // No yield needed; the write happened on this call stack.
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.entries()[0].access_type, AccessType::Write);
    }

    #[tokio::test]
    async fn test_sensitive_failure_propagates() {
        let logger = AuditLogger::spawn(Arc::new(FailingSink), 16);

        let err = logger
            .record(AuditEntry::new("alice", AccessType::Admin, "roles"))
            .unwrap_err();
        assert_eq!(err.code(), "AUDIT_FAILED");
    }

    #[tokio::test]
    async fn test_routine_entries_drain_asynchronously() {
        let sink = Arc::new(MemorySink::new());
        let logger = AuditLogger::spawn(sink.clone(), 16);

        logger
            .record(AuditEntry::new("alice", AccessType::Read, "sales").row_count(12))
            .unwrap();

        // Let the drain task run.
        tokio::task::yield_now().await;
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while sink.is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("routine entry never drained");

        assert_eq!(sink.entries()[0].access_type, AccessType::Read);
    }

    #[tokio::test]
    async fn test_routine_backpressure_drops_not_blocks() {
        // Capacity 1 and no yields: the second entry cannot fit.
        let sink = Arc::new(MemorySink::new());
        let logger = AuditLogger::spawn(sink.clone(), 1);

        logger.record_routine(AuditEntry::new("alice", AccessType::Read, "sales"));
        logger.record_routine(AuditEntry::new("alice", AccessType::Read, "sales"));

        tokio::task::yield_now().await;
        // At most one entry survives; the call itself never blocked.
        assert!(sink.len() <= 1);
    }

    #[test]
    fn test_entry_serialization_field_names() {
        let entry = AuditEntry::new("alice", AccessType::Query, "customers")
            .query("region = 'West'")
            .row_count(3)
            .rule(ScopeRule::Territory);
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["username"], "alice");
        assert_eq!(json["access_type"], "query");
        assert_eq!(json["resource"], "customers");
        assert_eq!(json["row_count"], 3);
        assert_eq!(json["rule"], "territory");
    }
}
