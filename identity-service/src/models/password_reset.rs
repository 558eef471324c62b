//! Password reset records, keyed by email, single-use.

use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;

use super::AccessToken;

/// Stored reset record. Only the hash of the secret is kept; issuing a new
/// reset for the same email replaces the previous record.
#[derive(Debug, Clone, FromRow)]
pub struct PasswordReset {
    pub email: String,
    pub secret_hash: String,
    pub created_utc: DateTime<Utc>,
}

impl PasswordReset {
    /// Create a reset record for an email. Returns the row to persist and the
    /// plaintext secret that goes out to the user.
    pub fn issue(email: String) -> (Self, String) {
        let secret = super::token::generate_secret();
        let record = Self {
            email,
            secret_hash: AccessToken::hash_secret(&secret),
            created_utc: Utc::now(),
        };
        (record, secret)
    }

    pub fn secret_matches(&self, secret: &str) -> bool {
        AccessToken::hash_secret(secret) == self.secret_hash
    }

    /// A record older than `max_age` can no longer be redeemed.
    pub fn is_expired(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.created_utc > max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_secret_matches_its_record() {
        let (record, secret) = PasswordReset::issue("sam@example.com".to_string());
        assert!(record.secret_matches(&secret));
        assert!(!record.secret_matches("wrong"));
        assert_ne!(record.secret_hash, secret);
    }

    #[test]
    fn record_expires_after_max_age() {
        let (mut record, _) = PasswordReset::issue("sam@example.com".to_string());
        let now = Utc::now();
        assert!(!record.is_expired(now, Duration::hours(1)));

        record.created_utc = now - Duration::hours(2);
        assert!(record.is_expired(now, Duration::hours(1)));
    }

    #[test]
    fn two_issues_produce_distinct_secrets() {
        let (_, first) = PasswordReset::issue("sam@example.com".to_string());
        let (_, second) = PasswordReset::issue("sam@example.com".to_string());
        assert_ne!(first, second);
    }
}
