//! Credential and session management.
//!
//! Owns password verification, the failed-attempt lockout state machine, and
//! the token lifecycle. Every operation takes the acting identity or token
//! explicitly; nothing reads ambient request state.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::models::{
    AccessToken, AuditLogEntry, IdentitySummary, RequestOrigin, TokenAbility, User, UserProfile,
};
use crate::services::roles::DEFAULT_ROLE;
use crate::services::{AuditService, Database, ServiceError};
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};

/// Input for account registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub nickname: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
}

/// Login origin metadata stamped onto the user row.
#[derive(Debug, Clone, Default)]
pub struct LoginMetadata {
    pub ip_address: Option<String>,
    pub device_info: Option<String>,
}

/// Profile fields a user may change. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl ProfileUpdate {
    /// Email and password changes require the current password.
    pub fn touches_credentials(&self) -> bool {
        self.email.is_some() || self.password.is_some()
    }
}

/// Token pair plus identity snapshot returned by a successful login.
#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: IdentitySummary,
}

/// Fresh access token returned by a successful refresh. The refresh token
/// itself stays valid until its own expiry.
#[derive(Debug, Serialize)]
pub struct RefreshedSession {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: IdentitySummary,
}

#[derive(Clone)]
pub struct AuthService {
    db: Database,
    audit: AuditService,
    security: SecurityConfig,
}

impl AuthService {
    pub fn new(db: Database, audit: AuditService, security: SecurityConfig) -> Self {
        Self { db, audit, security }
    }

    /// Register a new account and attach the default role.
    pub async fn register(
        &self,
        req: NewUser,
        origin: &RequestOrigin,
    ) -> Result<(UserProfile, Vec<String>), ServiceError> {
        if self.db.find_user_by_email(&req.email).await?.is_some() {
            return Err(ServiceError::EmailAlreadyRegistered);
        }

        let password_hash = hash_password(&Password::new(req.password))?;

        let mut user = User::new(req.name, req.email, password_hash.into_string());
        user.nickname = req.nickname;
        user.phone = req.phone;

        // The default role is seeded with the catalog; its absence is a
        // deployment fault, not a caller error.
        let default_role = self
            .db
            .find_role_by_name(DEFAULT_ROLE)
            .await?
            .ok_or_else(|| anyhow::anyhow!("role catalog is missing '{}'", DEFAULT_ROLE))?;

        self.db.insert_user_with_role(&user, default_role.role_id).await?;

        tracing::info!(user_id = %user.user_id, "User registered");
        self.audit.record_async(AuditLogEntry::new(
            "user_registered",
            Some(user.user_id),
            "register",
            serde_json::json!({ "email": user.email }),
            origin,
            "info",
        ));

        let roles = self.role_names(user.user_id).await?;
        Ok((user.profile(), roles))
    }

    /// Authenticate with email and password, enforcing the lockout state
    /// machine, and issue an access/refresh token pair.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        metadata: LoginMetadata,
    ) -> Result<AuthSession, ServiceError> {
        let origin = RequestOrigin {
            ip_address: metadata.ip_address.clone(),
            user_agent: metadata.device_info.clone(),
        };

        let user = self
            .db
            .find_user_by_email(email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let now = Utc::now();

        // An active lock rejects the attempt before the password is checked.
        if user.is_locked(now) {
            self.audit.record_async(AuditLogEntry::login_failure(
                "account_locked",
                Some(user.user_id),
                email,
                &origin,
            ));
            return Err(ServiceError::AccountLocked(user.lock_remaining_minutes(now)));
        }

        if !user.is_active {
            return Err(ServiceError::AccountDeactivated);
        }

        let supplied = Password::new(password.to_string());
        let stored = PasswordHashString::new(user.password_hash.clone());
        if verify_password(&supplied, &stored).is_err() {
            let attempts = self
                .db
                .record_login_failure(user.user_id)
                .await?
                .unwrap_or_default();

            self.audit.record_async(AuditLogEntry::login_failure(
                "login_failed",
                Some(user.user_id),
                email,
                &origin,
            ));

            if attempts >= self.security.lockout_threshold {
                let until = now + Duration::minutes(self.security.lockout_minutes);
                self.db.lock_account(user.user_id, until).await?;
                tracing::warn!(user_id = %user.user_id, "Account locked after repeated failures");
                return Err(ServiceError::AccountLocked(self.security.lockout_minutes));
            }

            return Err(ServiceError::InvalidCredentials);
        }

        self.db
            .record_login_success(
                user.user_id,
                metadata.ip_address.as_deref(),
                metadata.device_info.as_deref(),
            )
            .await?;

        let (access_row, access_token) = AccessToken::issue(
            user.user_id,
            TokenAbility::Full,
            Duration::hours(self.security.access_token_ttl_hours),
        );
        let (refresh_row, refresh_token) = AccessToken::issue(
            user.user_id,
            TokenAbility::Refresh,
            Duration::days(self.security.refresh_token_ttl_days),
        );
        self.db.insert_token(&access_row).await?;
        self.db.insert_token(&refresh_row).await?;

        tracing::info!(user_id = %user.user_id, "User logged in");

        Ok(AuthSession {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_at: access_row.expires_utc,
            user: self.identity_summary(&user).await?,
        })
    }

    /// Mint a new access token from a refresh token. The refresh token is not
    /// rotated or consumed.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedSession, ServiceError> {
        let (token_id, secret) =
            AccessToken::parse_composite(refresh_token).ok_or(ServiceError::InvalidToken)?;

        let stored = self
            .db
            .find_token_by_id(token_id)
            .await?
            .ok_or(ServiceError::InvalidToken)?;

        if !stored.secret_matches(secret) {
            tracing::warn!(token_id = %token_id, "Refresh token secret mismatch");
            return Err(ServiceError::InvalidToken);
        }
        if stored.ability() != Some(TokenAbility::Refresh) {
            return Err(ServiceError::InvalidToken);
        }
        if stored.is_expired(Utc::now()) {
            return Err(ServiceError::InvalidToken);
        }

        let user = self
            .db
            .find_user_by_id(stored.user_id)
            .await?
            .ok_or(ServiceError::InvalidToken)?;
        if !user.is_active {
            return Err(ServiceError::InvalidToken);
        }

        let (access_row, access_token) = AccessToken::issue(
            user.user_id,
            TokenAbility::Full,
            Duration::hours(self.security.access_token_ttl_hours),
        );
        self.db.insert_token(&access_row).await?;

        tracing::info!(user_id = %user.user_id, "Access token refreshed");

        Ok(RefreshedSession {
            access_token,
            token_type: "Bearer".to_string(),
            expires_at: access_row.expires_utc,
            user: self.identity_summary(&user).await?,
        })
    }

    /// Invalidate exactly the presented token.
    pub async fn logout(&self, token_id: Uuid) -> Result<(), ServiceError> {
        self.db.delete_token(token_id).await?;
        Ok(())
    }

    /// Issue a password reset secret, replacing any earlier record for the
    /// email. The plaintext secret goes back to the caller for delivery.
    pub async fn request_password_reset(
        &self,
        email: &str,
        origin: &RequestOrigin,
    ) -> Result<String, ServiceError> {
        let user = self
            .db
            .find_user_by_email(email)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        let (record, secret) = crate::models::PasswordReset::issue(user.email.clone());
        self.db.upsert_password_reset(&record).await?;

        tracing::info!(user_id = %user.user_id, "Password reset requested");
        self.audit.record_async(AuditLogEntry::new(
            "password_reset_requested",
            Some(user.user_id),
            "password_reset",
            serde_json::json!({ "email": user.email }),
            origin,
            "info",
        ));

        Ok(secret)
    }

    /// Redeem a reset secret: single-use, one-hour window, and every existing
    /// token of the user is revoked before this returns.
    pub async fn reset_password(
        &self,
        email: &str,
        secret: &str,
        new_password: &str,
        origin: &RequestOrigin,
    ) -> Result<(), ServiceError> {
        let record = self
            .db
            .find_password_reset(email)
            .await?
            .ok_or(ServiceError::InvalidResetToken)?;

        let max_age = Duration::minutes(self.security.reset_token_ttl_minutes);
        if record.is_expired(Utc::now(), max_age) || !record.secret_matches(secret) {
            return Err(ServiceError::InvalidResetToken);
        }

        let user = self
            .db
            .find_user_by_email(email)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        let new_hash = hash_password(&Password::new(new_password.to_string()))?;
        self.db
            .complete_password_reset(user.user_id, &user.email, new_hash.as_str())
            .await?;

        tracing::info!(user_id = %user.user_id, "Password reset completed");
        self.audit.record_async(AuditLogEntry::new(
            "password_reset",
            Some(user.user_id),
            "password_reset",
            serde_json::json!({ "email": user.email }),
            origin,
            "info",
        ));

        Ok(())
    }

    /// Update profile fields. Touching email or password requires the correct
    /// current password; a password change revokes every existing token.
    pub async fn update_profile(
        &self,
        user: &User,
        changes: ProfileUpdate,
        current_password: Option<&str>,
    ) -> Result<User, ServiceError> {
        if changes.touches_credentials() {
            let current = current_password.ok_or(ServiceError::CurrentPasswordRequired)?;
            let stored = PasswordHashString::new(user.password_hash.clone());
            verify_password(&Password::new(current.to_string()), &stored)
                .map_err(|_| ServiceError::CurrentPasswordIncorrect)?;
        }

        if let Some(ref new_email) = changes.email {
            if self.db.email_taken_by_other(new_email, user.user_id).await? {
                return Err(ServiceError::EmailAlreadyRegistered);
            }
        }

        self.db
            .update_profile_fields(
                user.user_id,
                changes.name.as_deref(),
                changes.nickname.as_deref(),
                changes.phone.as_deref(),
                changes.bio.as_deref(),
                changes.avatar.as_deref(),
                changes.email.as_deref(),
            )
            .await?;

        if let Some(ref new_password) = changes.password {
            let new_hash = hash_password(&Password::new(new_password.clone()))?;
            self.db.change_password(user.user_id, new_hash.as_str()).await?;
            tracing::info!(user_id = %user.user_id, "Password changed; sessions revoked");
        }

        self.db
            .find_user_by_id(user.user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)
    }

    /// Re-enable a deactivated account.
    pub async fn activate(&self, user_id: Uuid) -> Result<UserProfile, ServiceError> {
        if !self.db.activate_user(user_id).await? {
            return Err(ServiceError::UserNotFound);
        }
        self.load_profile(user_id).await
    }

    /// Disable an account. All of its tokens are gone by the time this
    /// returns, so no previously issued credential resolves afterwards.
    pub async fn deactivate(
        &self,
        user_id: Uuid,
        origin: &RequestOrigin,
    ) -> Result<UserProfile, ServiceError> {
        if !self.db.deactivate_user(user_id).await? {
            return Err(ServiceError::UserNotFound);
        }

        tracing::info!(user_id = %user_id, "Account deactivated; sessions revoked");
        self.audit.record_async(AuditLogEntry::new(
            "account_deactivated",
            Some(user_id),
            "deactivate",
            serde_json::json!({}),
            origin,
            "warning",
        ));

        self.load_profile(user_id).await
    }

    async fn identity_summary(&self, user: &User) -> Result<IdentitySummary, ServiceError> {
        Ok(IdentitySummary {
            id: user.user_id,
            name: user.name.clone(),
            email: user.email.clone(),
            roles: self.role_names(user.user_id).await?,
        })
    }

    async fn role_names(&self, user_id: Uuid) -> Result<Vec<String>, ServiceError> {
        let roles = self.db.roles_for_user(user_id).await?;
        Ok(roles.into_iter().map(|role| role.name).collect())
    }

    async fn load_profile(&self, user_id: Uuid) -> Result<UserProfile, ServiceError> {
        let user = self
            .db
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;
        Ok(user.profile())
    }
}
