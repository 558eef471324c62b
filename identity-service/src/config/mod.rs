use platform_core::config::{self as core_config, get_env, Environment};
use platform_core::error::AppError;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Knobs for the account-security state machine and token lifetimes.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Failed attempts before the account locks.
    pub lockout_threshold: i32,
    /// Length of the lockout window.
    pub lockout_minutes: i64,
    pub access_token_ttl_hours: i64,
    pub refresh_token_ttl_days: i64,
    pub reset_token_ttl_minutes: i64,
    pub allowed_origins: Vec<String>,
}

impl IdentityConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let environment: Environment = get_env("ENVIRONMENT", Some("dev"), false)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;
        let is_prod = environment.is_prod();

        let config = IdentityConfig {
            common,
            environment,
            service_name: get_env("SERVICE_NAME", Some("identity-service"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", "10", is_prod)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", "1", is_prod)?,
            },
            security: SecurityConfig {
                lockout_threshold: parse_env("LOCKOUT_THRESHOLD", "5", is_prod)?,
                lockout_minutes: parse_env("LOCKOUT_MINUTES", "15", is_prod)?,
                access_token_ttl_hours: parse_env("ACCESS_TOKEN_TTL_HOURS", "24", is_prod)?,
                refresh_token_ttl_days: parse_env("REFRESH_TOKEN_TTL_DAYS", "7", is_prod)?,
                reset_token_ttl_minutes: parse_env("RESET_TOKEN_TTL_MINUTES", "60", is_prod)?,
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), is_prod)?
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .collect(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.security.lockout_threshold <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "LOCKOUT_THRESHOLD must be positive"
            )));
        }
        if self.security.lockout_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "LOCKOUT_MINUTES must be positive"
            )));
        }
        if self.security.access_token_ttl_hours <= 0
            || self.security.refresh_token_ttl_days <= 0
            || self.security.reset_token_ttl_minutes <= 0
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Token lifetimes must be positive"
            )));
        }
        if self.environment.is_prod() && self.security.allowed_origins.iter().any(|o| o == "*") {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Wildcard CORS origin not allowed in production"
            )));
        }
        Ok(())
    }
}

fn parse_env<T>(name: &str, default: &str, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(name, Some(default), is_prod)?
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("{}: {}", name, e)))
}
