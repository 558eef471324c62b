//! Services layer for identity-service.
//!
//! Business logic for authentication, role administration, permission
//! aggregation, and the audit sink.

mod audit;
mod auth;
mod database;
pub mod error;
mod roles;

pub use audit::AuditService;
pub use auth::{AuthService, AuthSession, LoginMetadata, NewUser, ProfileUpdate, RefreshedSession};
pub use database::Database;
pub use error::ServiceError;
pub use roles::RoleService;
