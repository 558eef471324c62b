mod auth;
mod guard;

pub use auth::{auth_middleware, resolve_identity, AuthUser, CurrentUser};
pub use guard::{access_guard, AccessRequirement, GuardState};
