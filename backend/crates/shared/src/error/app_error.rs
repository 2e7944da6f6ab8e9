//! Application Error
//!
//! [`AppError`] is what finally reaches the client. Bounded contexts keep
//! their own `thiserror` enums and lower into this type when rendering.

use std::borrow::Cow;
use std::fmt;

use super::kind::ErrorKind;

type Text = Cow<'static, str>;

/// Client-facing error: a kind, a safe message and an optional next step
///
/// ```rust
/// use kernel::error::app_error::AppError;
///
/// let err = AppError::locked("Account is temporarily locked")
///     .with_action("Try again in 30 minutes");
/// assert_eq!(err.status_code(), 423);
/// assert_eq!(err.action(), Some("Try again in 30 minutes"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppError {
    kind: ErrorKind,
    message: Text,
    action: Option<Text>,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<Text>) -> Self {
        Self {
            kind,
            message: message.into(),
            action: None,
        }
    }

    pub fn unauthorized(message: impl Into<Text>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn locked(message: impl Into<Text>) -> Self {
        Self::new(ErrorKind::Locked, message)
    }

    pub fn internal(message: impl Into<Text>) -> Self {
        Self::new(ErrorKind::InternalServerError, message)
    }

    /// Attach what the caller should do next
    pub fn with_action(mut self, action: impl Into<Text>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            Some(action) => write!(f, "{}: {} ({})", self.kind, self.message, action),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for AppError {}
