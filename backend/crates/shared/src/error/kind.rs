//! Error Kind
//!
//! The small set of failure classes the HTTP surface can produce. Each
//! class owns exactly one status code.

use serde::Serialize;

/// Failure class
///
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// assert_eq!(ErrorKind::Locked.status_code(), 423);
/// assert_eq!(ErrorKind::Locked.title(), "Locked");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorKind {
    /// Request body is missing something required
    BadRequest,
    /// Credentials or token rejected
    Unauthorized,
    /// Identity is known but the account may not sign in
    Forbidden,
    NotFound,
    /// Account lockout in force (RFC 4918)
    Locked,
    InternalServerError,
}

impl ErrorKind {
    pub const fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Locked => 423,
            ErrorKind::InternalServerError => 500,
        }
    }

    /// Reason phrase, used as the problem-details title
    pub const fn title(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "Bad Request",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::Locked => "Locked",
            ErrorKind::InternalServerError => "Internal Server Error",
        }
    }

    /// Whether the message must be hidden from clients
    pub const fn is_server_error(&self) -> bool {
        matches!(self, ErrorKind::InternalServerError)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}
