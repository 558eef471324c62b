//! Request-boundary authorization guards.
//!
//! Two guard forms protect routes: any-of-roles and single-permission. Both
//! resolve the identity, append exactly one `api_access` audit entry before
//! the outcome branch, and then allow or reject the request. Role and
//! permission membership is read fresh on every evaluation, so an admin
//! grant or revocation takes effect on the very next request.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use platform_core::error::AppError;

use crate::middleware::auth::resolve_identity;
use crate::models::{AuditLogEntry, RequestOrigin};
use crate::AppState;

/// What a guarded route demands of the caller.
#[derive(Debug, Clone)]
pub enum AccessRequirement {
    /// At least one of the named roles.
    AnyRole(Vec<String>),
    /// The named permission, via union over the caller's roles.
    Permission(String),
}

impl AccessRequirement {
    pub fn any_role<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AccessRequirement::AnyRole(roles.into_iter().map(Into::into).collect())
    }

    pub fn permission(permission: impl Into<String>) -> Self {
        AccessRequirement::Permission(permission.into())
    }

    fn describe(&self) -> serde_json::Value {
        match self {
            AccessRequirement::AnyRole(roles) => {
                serde_json::json!({ "required_roles": roles })
            }
            AccessRequirement::Permission(permission) => {
                serde_json::json!({ "required_permission": permission })
            }
        }
    }
}

/// State for a guarded route: the shared application state plus the
/// requirement declared at route registration.
pub type GuardState = (AppState, AccessRequirement);

/// Guard middleware. Mount with
/// `from_fn_with_state((state, requirement), access_guard)`.
pub async fn access_guard(
    State((state, requirement)): State<GuardState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let origin = RequestOrigin::from_headers(req.headers());
    let endpoint = req.uri().path().to_string();
    let method = req.method().to_string();

    let identity = resolve_identity(&state, req.headers()).await?;

    // Exactly one audit entry per attempt, allowed or not, written before the
    // outcome is decided.
    state
        .audit
        .record(AuditLogEntry::api_access(
            identity.as_ref().map(|current| current.user.user_id),
            requirement.describe(),
            &endpoint,
            &method,
            &origin,
        ))
        .await;

    let Some(current) = identity else {
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Authentication required"
        )));
    };

    let allowed = match &requirement {
        AccessRequirement::AnyRole(roles) => state
            .roles
            .has_any_role(current.user.user_id, roles)
            .await
            .map_err(AppError::from)?,
        AccessRequirement::Permission(permission) => state
            .roles
            .has_permission(current.user.user_id, permission)
            .await
            .map_err(AppError::from)?,
    };

    if !allowed {
        tracing::warn!(
            user_id = %current.user.user_id,
            requirement = ?requirement,
            endpoint = %endpoint,
            method = %method,
            "Unauthorized access attempt"
        );
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Insufficient permissions to access this resource"
        )));
    }

    req.extensions_mut().insert(current);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_requirement_description_lists_roles() {
        let requirement = AccessRequirement::any_role(["Admin", "Seller"]);
        let description = requirement.describe();
        assert_eq!(
            description["required_roles"],
            serde_json::json!(["Admin", "Seller"])
        );
    }

    #[test]
    fn permission_requirement_description_names_permission() {
        let requirement = AccessRequirement::permission("view_audit_logs");
        assert_eq!(
            requirement.describe()["required_permission"],
            "view_audit_logs"
        );
    }
}
