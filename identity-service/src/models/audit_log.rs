//! Append-only audit trail entries.
//!
//! Every guarded request and every administrative role change produces one
//! entry. Entries are never mutated or deleted by this service.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Network origin attached to audit entries.
#[derive(Debug, Clone, Default)]
pub struct RequestOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestOrigin {
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        let header_value = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.to_string())
        };
        Self {
            ip_address: header_value("x-forwarded-for"),
            user_agent: header_value("user-agent"),
        }
    }
}

/// One audit row. `actor_id` is null for unauthenticated attempts.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuditLogEntry {
    pub entry_id: Uuid,
    pub event_type: String,
    pub actor_id: Option<Uuid>,
    pub operation: String,
    pub data: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub severity: String,
    pub created_utc: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(
        event_type: impl Into<String>,
        actor_id: Option<Uuid>,
        operation: impl Into<String>,
        data: serde_json::Value,
        origin: &RequestOrigin,
        severity: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            event_type: event_type.into(),
            actor_id,
            operation: operation.into(),
            data,
            ip_address: origin.ip_address.clone(),
            user_agent: origin.user_agent.clone(),
            severity: severity.into(),
            created_utc: Utc::now(),
        }
    }

    /// Entry for a guarded request, written whether or not access is granted.
    pub fn api_access(
        actor_id: Option<Uuid>,
        requirement: serde_json::Value,
        endpoint: &str,
        method: &str,
        origin: &RequestOrigin,
    ) -> Self {
        Self::new(
            "api_access",
            actor_id,
            "access_attempt",
            serde_json::json!({
                "endpoint": endpoint,
                "method": method,
                "requirement": requirement,
            }),
            origin,
            "info",
        )
    }

    /// Entry for a committed role grant or revocation.
    pub fn role_change(
        event_type: &str,
        actor_id: Uuid,
        target_user_id: Uuid,
        role_name: &str,
        origin: &RequestOrigin,
    ) -> Self {
        Self::new(
            event_type,
            Some(actor_id),
            "role_change",
            serde_json::json!({
                "target_user_id": target_user_id,
                "role_name": role_name,
            }),
            origin,
            "info",
        )
    }

    /// Entry for a failed or blocked login attempt.
    pub fn login_failure(
        event_type: &str,
        user_id: Option<Uuid>,
        email: &str,
        origin: &RequestOrigin,
    ) -> Self {
        Self::new(
            event_type,
            user_id,
            "login",
            serde_json::json!({ "email": email }),
            origin,
            "warning",
        )
    }
}
