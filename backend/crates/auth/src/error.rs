//! Auth Error Types
//!
//! Auth-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::password::PasswordHashError;
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Too many failed attempts. `None` means locked until released.
    #[error("Account is temporarily locked")]
    AccountLocked { retry_after_minutes: Option<i64> },

    /// Unknown email and wrong password both map here
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is inactive")]
    AccountInactive,

    /// A revoked refresh token was presented again
    #[error("Refresh token reuse detected")]
    ReuseDetected,

    #[error("Refresh token is invalid or expired")]
    TokenInvalid,

    #[error("Refresh token not found")]
    TokenNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Token generation failed: {0}")]
    TokenGenerationFailed(String),

    /// Missing or invalid bearer access token
    #[error("Authentication required")]
    Unauthorized,

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::AccountLocked { .. } => StatusCode::LOCKED,
            AuthError::InvalidCredentials
            | AuthError::ReuseDetected
            | AuthError::TokenInvalid
            | AuthError::TokenNotFound
            | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::AccountInactive => StatusCode::FORBIDDEN,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::MissingField(_) => StatusCode::BAD_REQUEST,
            AuthError::TokenGenerationFailed(_) | AuthError::Database(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::AccountLocked { .. } => ErrorKind::Locked,
            AuthError::InvalidCredentials
            | AuthError::ReuseDetected
            | AuthError::TokenInvalid
            | AuthError::TokenNotFound
            | AuthError::Unauthorized => ErrorKind::Unauthorized,
            AuthError::AccountInactive => ErrorKind::Forbidden,
            AuthError::UserNotFound => ErrorKind::NotFound,
            AuthError::MissingField(_) => ErrorKind::BadRequest,
            AuthError::TokenGenerationFailed(_) | AuthError::Database(_) | AuthError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Convert to AppError
    ///
    /// Server-side details (SQL errors, signer failures) stay in the logs.
    pub fn to_app_error(&self) -> AppError {
        match self {
            AuthError::AccountLocked {
                retry_after_minutes: Some(minutes),
            } => AppError::locked(self.to_string())
                .with_action(format!("Try again in {} minutes", minutes)),
            AuthError::AccountLocked { retry_after_minutes: None } => {
                AppError::locked(self.to_string())
                    .with_action("Contact an administrator or try again later")
            }
            AuthError::ReuseDetected => AppError::unauthorized(self.to_string())
                .with_action("All sessions have been terminated. Please sign in again"),
            AuthError::TokenGenerationFailed(_) | AuthError::Database(_) | AuthError::Internal(_) => {
                AppError::internal("Internal server error")
            }
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::ReuseDetected => {
                tracing::error!("Responding to refresh token reuse");
            }
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Internal(msg) | AuthError::TokenGenerationFailed(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::AccountLocked { retry_after_minutes } => {
                tracing::warn!(?retry_after_minutes, "Login attempt on locked account");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<PasswordHashError> for AuthError {
    fn from(err: PasswordHashError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
