//! Self-service profile endpoints.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use platform_core::error::AppError;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::RequestOrigin;
use crate::services::{ProfileUpdate, ServiceError};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    pub avatar: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    pub current_password: Option<String>,
}

pub async fn show(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let current = user.0;
    let roles = state.roles.roles_of(current.user.user_id).await?;
    Ok(Json(serde_json::json!({
        "user": current.user.profile(),
        "roles": roles,
    })))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let current = user.0;
    let updated = state
        .auth
        .update_profile(
            &current.user,
            ProfileUpdate {
                name: req.name,
                nickname: req.nickname,
                phone: req.phone,
                bio: req.bio,
                avatar: req.avatar,
                email: req.email,
                password: req.password,
            },
            req.current_password.as_deref(),
        )
        .await?;

    Ok(Json(serde_json::json!({ "user": updated.profile() })))
}

pub async fn register_seller(
    State(state): State<AppState>,
    headers: HeaderMap,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let current = user.0;
    let origin = RequestOrigin::from_headers(&headers);

    state
        .roles
        .register_as_seller(current.user.user_id, &origin)
        .await?;

    let roles = state.roles.roles_of(current.user.user_id).await?;
    Ok(Json(serde_json::json!({
        "message": "Registered as seller",
        "roles": roles,
    })))
}

pub async fn user_permissions(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .db
        .find_user_by_id(user_id)
        .await
        .map_err(|e| AppError::from(ServiceError::Database(e)))?
        .ok_or_else(|| AppError::from(ServiceError::UserNotFound))?;

    let permissions = state.roles.permissions_of(user.user_id).await?;
    Ok(Json(serde_json::json!({
        "user_id": user.user_id,
        "permissions": permissions,
    })))
}
