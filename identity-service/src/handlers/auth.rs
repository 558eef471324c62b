//! Authentication endpoints: registration, session lifecycle, password reset.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use platform_core::error::AppError;
use serde::Deserialize;
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::RequestOrigin;
use crate::services::{LoginMetadata, NewUser};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub nickname: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub phone: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetConfirm {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub token: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let origin = RequestOrigin::from_headers(&headers);
    let (profile, roles) = state
        .auth
        .register(
            NewUser {
                name: req.name,
                nickname: req.nickname,
                email: req.email,
                phone: req.phone,
                password: req.password,
            },
            &origin,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "user": profile, "roles": roles })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let origin = RequestOrigin::from_headers(&headers);
    let session = state
        .auth
        .login(
            &req.email,
            &req.password,
            LoginMetadata {
                ip_address: origin.ip_address,
                device_info: origin.user_agent,
            },
        )
        .await?;

    Ok(Json(session))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.auth.refresh(&req.refresh_token).await?;
    Ok(Json(session))
}

pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    state.auth.logout(user.0.token_id).await?;
    Ok(Json(serde_json::json!({ "message": "Logged out successfully" })))
}

pub async fn request_password_reset(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PasswordResetRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let origin = RequestOrigin::from_headers(&headers);
    let reset_token = state.auth.request_password_reset(&req.email, &origin).await?;

    // Delivery belongs to the notification layer; the secret is returned so
    // that layer can build the reset link.
    Ok(Json(serde_json::json!({
        "message": "Password reset token issued",
        "reset_token": reset_token,
    })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PasswordResetConfirm>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let origin = RequestOrigin::from_headers(&headers);
    state
        .auth
        .reset_password(&req.email, &req.token, &req.new_password, &origin)
        .await?;

    Ok(Json(serde_json::json!({ "message": "Password has been reset" })))
}
