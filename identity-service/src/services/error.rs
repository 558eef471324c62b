use platform_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("The provided credentials are incorrect")]
    InvalidCredentials,

    #[error("Account is locked for {0} more minutes")]
    AccountLocked(i64),

    #[error("This account has been deactivated")]
    AccountDeactivated,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Role '{0}' not found")]
    RoleNotFound(String),

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Current password is required for this update")]
    CurrentPasswordRequired,

    #[error("Current password is incorrect")]
    CurrentPasswordIncorrect,

    #[error("User is already registered as a seller")]
    AlreadySeller,

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::anyhow!(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::InvalidCredentials => {
                AppError::AuthError(anyhow::anyhow!("The provided credentials are incorrect"))
            }
            ServiceError::AccountLocked(minutes) => AppError::AccountLocked(minutes),
            ServiceError::AccountDeactivated => {
                AppError::Forbidden(anyhow::anyhow!("This account has been deactivated"))
            }
            ServiceError::InvalidToken => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid or expired token"))
            }
            ServiceError::InvalidResetToken => {
                AppError::BadRequest(anyhow::anyhow!("Invalid or expired reset token"))
            }
            ServiceError::UserNotFound => AppError::NotFound(anyhow::anyhow!("User not found")),
            ServiceError::RoleNotFound(name) => {
                AppError::NotFound(anyhow::anyhow!("Role '{}' not found", name))
            }
            ServiceError::EmailAlreadyRegistered => {
                AppError::Conflict(anyhow::anyhow!("Email already registered"))
            }
            ServiceError::CurrentPasswordRequired => AppError::BadRequest(anyhow::anyhow!(
                "Current password is required for this update"
            )),
            ServiceError::CurrentPasswordIncorrect => {
                AppError::BadRequest(anyhow::anyhow!("Current password is incorrect"))
            }
            ServiceError::AlreadySeller => {
                AppError::Conflict(anyhow::anyhow!("User is already registered as a seller"))
            }
            ServiceError::Validation(message) => AppError::BadRequest(anyhow::anyhow!(message)),
        }
    }
}
