pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Json, Router,
};
use platform_core::error::AppError;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::IdentityConfig;
use crate::middleware::{access_guard, AccessRequirement};
use crate::services::{AuditService, AuthService, Database, RoleService};

#[derive(Clone)]
pub struct AppState {
    pub config: IdentityConfig,
    pub db: Database,
    pub audit: AuditService,
    pub auth: AuthService,
    pub roles: RoleService,
}

impl AppState {
    pub fn new(config: IdentityConfig, db: Database) -> Self {
        let audit = AuditService::new(db.clone());
        let auth = AuthService::new(db.clone(), audit.clone(), config.security.clone());
        let roles = RoleService::new(db.clone());
        Self {
            config,
            db,
            audit,
            auth,
            roles,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    // Admin surface: role administration and account state, behind the
    // any-of-roles guard declared here at registration time.
    let admin_routes = Router::new()
        .route("/roles/assign", post(handlers::admin::assign_role))
        .route("/roles/remove", post(handlers::admin::remove_role))
        .route("/admin/users/:user_id/roles", get(handlers::admin::user_roles))
        .route(
            "/admin/users/:user_id/activate",
            put(handlers::admin::activate_user),
        )
        .route(
            "/admin/users/:user_id/deactivate",
            put(handlers::admin::deactivate_user),
        )
        .layer(from_fn_with_state(
            (state.clone(), AccessRequirement::any_role(["Admin"])),
            access_guard,
        ));

    let audit_routes = Router::new()
        .route("/admin/audit-log", get(handlers::admin::audit_log))
        .layer(from_fn_with_state(
            (
                state.clone(),
                AccessRequirement::permission("view_audit_logs"),
            ),
            access_guard,
        ));

    // Routes that need an identity but no particular role or permission.
    let session_routes = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route(
            "/user/profile",
            get(handlers::profile::show).put(handlers::profile::update),
        )
        .route(
            "/user/register-seller",
            post(handlers::profile::register_seller),
        )
        .route(
            "/users/:user_id/permissions",
            get(handlers::profile::user_permissions),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .security
                .allowed_origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::error!("Invalid CORS origin '{}': {}", origin, e);
                        None
                    }
                })
                .collect::<Vec<HeaderValue>>(),
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route(
            "/auth/password/reset-request",
            post(handlers::auth::request_password_reset),
        )
        .route("/auth/password/reset", post(handlers::auth::reset_password))
        .merge(session_routes)
        .merge(admin_routes)
        .merge(audit_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Service health check.
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.db.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Database health check failed");
        AppError::DatabaseError(anyhow::anyhow!(e))
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "checks": { "postgres": "up" }
    })))
}
