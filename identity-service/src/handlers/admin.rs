//! Administrative endpoints: role grants, account state, audit trail.
//!
//! Every route here sits behind an authorization guard declared at route
//! registration; handlers receive the already-resolved acting identity.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use platform_core::error::AppError;
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::AuthUser;
use crate::models::RequestOrigin;
use crate::services::ServiceError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RoleChangeRequest {
    pub user_id: Uuid,
    pub role_name: String,
}

#[derive(Debug, Deserialize)]
pub struct AuditLogQuery {
    pub limit: Option<i64>,
}

pub async fn assign_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    actor: AuthUser,
    Json(req): Json<RoleChangeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let origin = RequestOrigin::from_headers(&headers);
    state
        .roles
        .assign_role(actor.0.user.user_id, req.user_id, &req.role_name, &origin)
        .await?;

    let roles = state.roles.roles_of(req.user_id).await?;
    Ok(Json(serde_json::json!({
        "message": "Role assigned",
        "user_id": req.user_id,
        "roles": roles,
    })))
}

pub async fn remove_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    actor: AuthUser,
    Json(req): Json<RoleChangeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let origin = RequestOrigin::from_headers(&headers);
    state
        .roles
        .remove_role(actor.0.user.user_id, req.user_id, &req.role_name, &origin)
        .await?;

    let roles = state.roles.roles_of(req.user_id).await?;
    Ok(Json(serde_json::json!({
        "message": "Role removed",
        "user_id": req.user_id,
        "roles": roles,
    })))
}

pub async fn user_roles(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .db
        .find_user_by_id(user_id)
        .await
        .map_err(|e| AppError::from(ServiceError::Database(e)))?
        .ok_or_else(|| AppError::from(ServiceError::UserNotFound))?;

    let roles = state.roles.roles_of(user.user_id).await?;
    let permissions = state.roles.permissions_of(user.user_id).await?;
    Ok(Json(serde_json::json!({
        "user": user.profile(),
        "roles": roles,
        "permissions": permissions,
    })))
}

pub async fn activate_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.auth.activate(user_id).await?;
    Ok(Json(serde_json::json!({
        "message": "Account activated",
        "user": profile,
    })))
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let origin = RequestOrigin::from_headers(&headers);
    let profile = state.auth.deactivate(user_id, &origin).await?;
    Ok(Json(serde_json::json!({
        "message": "Account deactivated",
        "user": profile,
    })))
}

pub async fn audit_log(
    State(state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let entries = state
        .db
        .recent_audit_entries(limit)
        .await
        .map_err(|e| AppError::from(ServiceError::Database(e)))?;

    Ok(Json(serde_json::json!({ "entries": entries })))
}
