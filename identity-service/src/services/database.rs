//! PostgreSQL access layer for identity-service.
//!
//! One method per query. Operations with multi-row invariants (role change +
//! audit row, password rotation + token purge) run inside a transaction so a
//! crash mid-operation can never leave them half-applied.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::{AccessToken, AuditLogEntry, PasswordReset, Role, User};

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check - ping the database.
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ==================== User Operations ====================

    pub async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    /// Whether the email is already taken by a different account.
    pub async fn email_taken_by_other(
        &self,
        email: &str,
        excluding: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND user_id <> $2)",
        )
        .bind(email)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await
    }

    /// Insert a new user and attach their default role in one transaction.
    pub async fn insert_user_with_role(
        &self,
        user: &User,
        role_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (user_id, name, nickname, email, password_hash, phone, bio, avatar,
                               is_active, failed_login_attempts, locked_until, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.name)
        .bind(&user.nickname)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone)
        .bind(&user.bio)
        .bind(&user.avatar)
        .bind(user.is_active)
        .bind(user.failed_login_attempts)
        .bind(user.locked_until)
        .bind(user.created_utc)
        .bind(user.updated_utc)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO role_assignments (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user.user_id)
        .bind(role_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }

    /// Atomically bump the failed-login counter and return the new value.
    /// Single-row read-modify-write, so concurrent failures each observe a
    /// distinct count.
    pub async fn record_login_failure(&self, user_id: Uuid) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE users
            SET failed_login_attempts = failed_login_attempts + 1, updated_utc = NOW()
            WHERE user_id = $1
            RETURNING failed_login_attempts
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn lock_account(
        &self,
        user_id: Uuid,
        until: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET locked_until = $1, updated_utc = NOW() WHERE user_id = $2")
            .bind(until)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Reset the failure counter, clear any lock, and stamp login metadata.
    pub async fn record_login_success(
        &self,
        user_id: Uuid,
        ip_address: Option<&str>,
        device_info: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET failed_login_attempts = 0,
                locked_until = NULL,
                last_login_at = NOW(),
                last_login_ip = $2,
                last_login_device = $3,
                updated_utc = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(ip_address)
        .bind(device_info)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Apply non-credential profile fields. Absent fields keep their value.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_profile_fields(
        &self,
        user_id: Uuid,
        name: Option<&str>,
        nickname: Option<&str>,
        phone: Option<&str>,
        bio: Option<&str>,
        avatar: Option<&str>,
        email: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                nickname = COALESCE($3, nickname),
                phone = COALESCE($4, phone),
                bio = COALESCE($5, bio),
                avatar = COALESCE($6, avatar),
                email = COALESCE($7, email),
                updated_utc = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(nickname)
        .bind(phone)
        .bind(bio)
        .bind(avatar)
        .bind(email)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Rotate the password hash and purge every token of the user in one
    /// transaction, so no pre-rotation token survives a reported success.
    pub async fn change_password(&self, user_id: Uuid, new_hash: &str) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE users SET password_hash = $1, updated_utc = NOW() WHERE user_id = $2")
            .bind(new_hash)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM access_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await
    }

    pub async fn activate_user(&self, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET is_active = TRUE, updated_utc = NOW() WHERE user_id = $1")
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Deactivate an account and purge its tokens together.
    pub async fn deactivate_user(&self, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result =
            sqlx::query("UPDATE users SET is_active = FALSE, updated_utc = NOW() WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;

        sqlx::query("DELETE FROM access_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    // ==================== Role Operations ====================

    pub async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, sqlx::Error> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE LOWER(name) = LOWER($1)")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
    }

    /// Roles currently assigned to a user. Read fresh on every call.
    pub async fn roles_for_user(&self, user_id: Uuid) -> Result<Vec<Role>, sqlx::Error> {
        sqlx::query_as::<_, Role>(
            r#"
            SELECT r.* FROM roles r
            JOIN role_assignments ra ON r.role_id = ra.role_id
            WHERE ra.user_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Attach a role. The assignment row and its audit entry commit in one
    /// transaction; the no-op path (already assigned) writes neither. Returns
    /// whether a new assignment was created.
    pub async fn assign_role(
        &self,
        user_id: Uuid,
        role_id: Uuid,
        audit: &AuditLogEntry,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO role_assignments (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&mut *tx)
        .await?;

        let inserted = result.rows_affected() > 0;
        if inserted {
            insert_audit_on(&mut *tx, audit).await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Detach a role, idempotently, with the same transactional discipline as
    /// `assign_role`. Returns whether an assignment was actually removed.
    pub async fn remove_role(
        &self,
        user_id: Uuid,
        role_id: Uuid,
        audit: &AuditLogEntry,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result =
            sqlx::query("DELETE FROM role_assignments WHERE user_id = $1 AND role_id = $2")
                .bind(user_id)
                .bind(role_id)
                .execute(&mut *tx)
                .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            insert_audit_on(&mut *tx, audit).await?;
        }

        tx.commit().await?;
        Ok(removed)
    }

    // ==================== Token Operations ====================

    pub async fn insert_token(&self, token: &AccessToken) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO access_tokens (token_id, user_id, ability, secret_hash, expires_utc, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(token.token_id)
        .bind(token.user_id)
        .bind(&token.ability)
        .bind(&token.secret_hash)
        .bind(token.expires_utc)
        .bind(token.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_token_by_id(
        &self,
        token_id: Uuid,
    ) -> Result<Option<AccessToken>, sqlx::Error> {
        sqlx::query_as::<_, AccessToken>("SELECT * FROM access_tokens WHERE token_id = $1")
            .bind(token_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Delete exactly one token (logout of the presented credential).
    pub async fn delete_token(&self, token_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE token_id = $1")
            .bind(token_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_all_tokens_for_user(&self, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ==================== Password Reset Operations ====================

    /// Store a reset record, replacing any prior record for the email.
    pub async fn upsert_password_reset(&self, record: &PasswordReset) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (email, secret_hash, created_utc)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE
            SET secret_hash = EXCLUDED.secret_hash, created_utc = EXCLUDED.created_utc
            "#,
        )
        .bind(&record.email)
        .bind(&record.secret_hash)
        .bind(record.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<PasswordReset>, sqlx::Error> {
        sqlx::query_as::<_, PasswordReset>(
            "SELECT * FROM password_reset_tokens WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    /// Commit a password reset: new hash, reset record consumed, every token
    /// of the user revoked - atomically.
    pub async fn complete_password_reset(
        &self,
        user_id: Uuid,
        email: &str,
        new_hash: &str,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE users SET password_hash = $1, updated_utc = NOW() WHERE user_id = $2")
            .bind(new_hash)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM password_reset_tokens WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM access_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await
    }

    // ==================== Audit Operations ====================

    pub async fn insert_audit(&self, entry: &AuditLogEntry) -> Result<(), sqlx::Error> {
        insert_audit_on(&self.pool, entry).await
    }

    pub async fn recent_audit_entries(
        &self,
        limit: i64,
    ) -> Result<Vec<AuditLogEntry>, sqlx::Error> {
        sqlx::query_as::<_, AuditLogEntry>(
            "SELECT * FROM audit_logs ORDER BY created_utc DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}

/// Insert an audit row on any executor, so the same statement serves both the
/// standalone sink and transactional role changes.
async fn insert_audit_on<'e, E>(executor: E, entry: &AuditLogEntry) -> Result<(), sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO audit_logs (entry_id, event_type, actor_id, operation, data,
                                ip_address, user_agent, severity, created_utc)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(entry.entry_id)
    .bind(&entry.event_type)
    .bind(entry.actor_id)
    .bind(&entry.operation)
    .bind(&entry.data)
    .bind(&entry.ip_address)
    .bind(&entry.user_agent)
    .bind(&entry.severity)
    .bind(entry.created_utc)
    .execute(executor)
    .await?;
    Ok(())
}
