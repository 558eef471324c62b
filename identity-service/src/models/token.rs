//! Opaque bearer tokens with an ability scope.
//!
//! One token type covers both session flavors: full-access tokens (`*`) and
//! refresh-only tokens. Callers branch on the ability tag, never on separate
//! types. The wire form handed to clients is `"<token_id>|<secret>"`; the
//! database keeps only the SHA-256 of the secret half.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use uuid::Uuid;

/// What a token is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAbility {
    /// Full API access.
    Full,
    /// Only usable to mint a new access token.
    Refresh,
}

impl TokenAbility {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenAbility::Full => "*",
            TokenAbility::Refresh => "refresh",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "*" => Some(TokenAbility::Full),
            "refresh" => Some(TokenAbility::Refresh),
            _ => None,
        }
    }
}

/// Stored token row.
#[derive(Debug, Clone, FromRow)]
pub struct AccessToken {
    pub token_id: Uuid,
    pub user_id: Uuid,
    pub ability: String,
    pub secret_hash: String,
    pub expires_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

impl AccessToken {
    /// Mint a token for a user. Returns the row to persist and the plaintext
    /// composite to hand to the client; the plaintext is not recoverable
    /// afterwards.
    pub fn issue(user_id: Uuid, ability: TokenAbility, ttl: Duration) -> (Self, String) {
        let now = Utc::now();
        let secret = generate_secret();
        let token = Self {
            token_id: Uuid::new_v4(),
            user_id,
            ability: ability.as_str().to_string(),
            secret_hash: Self::hash_secret(&secret),
            expires_utc: now + ttl,
            created_utc: now,
        };
        let composite = format!("{}|{}", token.token_id, secret);
        (token, composite)
    }

    /// Split a presented bearer value into its id and secret halves.
    pub fn parse_composite(value: &str) -> Option<(Uuid, &str)> {
        let (id_part, secret) = value.split_once('|')?;
        if secret.is_empty() {
            return None;
        }
        let token_id = Uuid::parse_str(id_part).ok()?;
        Some((token_id, secret))
    }

    /// Hash a token secret with SHA-256.
    pub fn hash_secret(secret: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn secret_matches(&self, secret: &str) -> bool {
        Self::hash_secret(secret) == self.secret_hash
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_utc
    }

    pub fn ability(&self) -> Option<TokenAbility> {
        TokenAbility::parse(&self.ability)
    }
}

pub(crate) fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}
