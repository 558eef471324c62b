//! Audit log sink.
//!
//! Appends are isolated from the calling operation: a failed write is logged
//! and dropped, never surfaced to the user. Role changes are the exception -
//! their audit rows commit inside the role-change transaction and go through
//! `Database::assign_role` / `remove_role` instead of this sink.

use crate::models::AuditLogEntry;
use crate::services::Database;

#[derive(Clone)]
pub struct AuditService {
    db: Database,
}

impl AuditService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Append an entry, waiting for the write. Failures are swallowed after
    /// logging so the guarded operation proceeds on its own merits.
    pub async fn record(&self, entry: AuditLogEntry) {
        if let Err(e) = self.db.insert_audit(&entry).await {
            tracing::error!(
                error = %e,
                event_type = %entry.event_type,
                "Failed to write audit log entry"
            );
        }
    }

    /// Append an entry without blocking the caller.
    pub fn record_async(&self, entry: AuditLogEntry) {
        let db = self.db.clone();
        tokio::spawn(async move {
            if let Err(e) = db.insert_audit(&entry).await {
                tracing::error!(
                    error = %e,
                    event_type = %entry.event_type,
                    "Failed to write audit log entry"
                );
            }
        });
    }
}
