//! User model - platform accounts with login security state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// User entity. The password is stored only as an argon2 hash; the lockout
/// fields implement the failed-attempt state machine.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub name: String,
    pub nickname: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
    pub last_login_device: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl User {
    /// Create a new account in its initial state.
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            user_id: Uuid::new_v4(),
            name,
            nickname: None,
            email,
            password_hash,
            phone: None,
            bio: None,
            avatar: None,
            is_active: true,
            failed_login_attempts: 0,
            locked_until: None,
            last_login_at: None,
            last_login_ip: None,
            last_login_device: None,
            created_utc: now,
            updated_utc: now,
        }
    }

    /// Whether a lockout window is currently active.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        matches!(self.locked_until, Some(until) if until > now)
    }

    /// Minutes left in the lockout window, rounded up so an active lock never
    /// reports zero.
    pub fn lock_remaining_minutes(&self, now: DateTime<Utc>) -> i64 {
        match self.locked_until {
            Some(until) if until > now => {
                let seconds = (until - now).num_seconds();
                (seconds + 59) / 60
            }
            _ => 0,
        }
    }

    /// Convert to the sanitized profile shape (no credential or lockout state).
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            user_id: self.user_id,
            name: self.name.clone(),
            nickname: self.nickname.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            bio: self.bio.clone(),
            avatar: self.avatar.clone(),
            is_active: self.is_active,
            last_login_at: self.last_login_at,
            created_utc: self.created_utc,
        }
    }
}

/// Profile shape for API responses, without sensitive fields.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub name: String,
    pub nickname: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

/// Identity snapshot returned alongside issued tokens.
#[derive(Debug, Clone, Serialize)]
pub struct IdentitySummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
}
