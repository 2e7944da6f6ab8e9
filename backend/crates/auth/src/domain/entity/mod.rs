//! Entity Module

pub mod account_lockout;
pub mod login_attempt;
pub mod refresh_token;
pub mod user;

pub use account_lockout::AccountLockout;
pub use login_attempt::{FailureReason, LoginAttempt};
pub use refresh_token::{RefreshToken, SessionInfo};
pub use user::{User, UserProfile};
