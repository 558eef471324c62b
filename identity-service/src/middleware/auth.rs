//! Bearer-token identity resolution.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use platform_core::error::AppError;
use uuid::Uuid;

use crate::models::TokenAbility;
use crate::services::ServiceError;
use crate::AppState;

/// The acting identity for the current request, resolved from the presented
/// token. Carried in request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: crate::models::User,
    pub token_id: Uuid,
}

/// Resolve the bearer token in `headers` to an identity.
///
/// Returns `Ok(None)` for every unauthenticated shape: missing header,
/// malformed composite, unknown token, secret mismatch, refresh-only ability,
/// expired token, or inactive owner. `Err` is reserved for storage faults.
pub async fn resolve_identity(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<CurrentUser>, AppError> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(bearer) = bearer else {
        return Ok(None);
    };

    let Some((token_id, secret)) = crate::models::AccessToken::parse_composite(bearer) else {
        return Ok(None);
    };

    let stored = state
        .db
        .find_token_by_id(token_id)
        .await
        .map_err(|e| AppError::from(ServiceError::Database(e)))?;

    let Some(stored) = stored else {
        return Ok(None);
    };

    if !stored.secret_matches(secret)
        || stored.ability() != Some(TokenAbility::Full)
        || stored.is_expired(Utc::now())
    {
        return Ok(None);
    }

    let user = state
        .db
        .find_user_by_id(stored.user_id)
        .await
        .map_err(|e| AppError::from(ServiceError::Database(e)))?;

    match user {
        Some(user) if user.is_active => Ok(Some(CurrentUser {
            user,
            token_id: stored.token_id,
        })),
        _ => Ok(None),
    }
}

/// Middleware requiring a valid identity, with no role or permission
/// requirement attached.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let current = resolve_identity(&state, req.headers())
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Authentication required")))?;

    req.extensions_mut().insert(current);
    Ok(next.run(req).await)
}

/// Extractor handing the resolved identity to handlers.
pub struct AuthUser(pub CurrentUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let current = parts.extensions.get::<CurrentUser>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Identity missing from request extensions; is the route behind auth middleware?"
            ))
        })?;

        Ok(AuthUser(current.clone()))
    }
}
