//! Login Attempt Entity
//!
//! One row per login call, written once and only ever aggregated.

use chrono::{DateTime, Utc};
use kernel::id::LoginAttemptId;
use platform::client::ClientContext;

/// Why an attempt failed, stored as text in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    EmailNotFound,
    WrongPassword,
    AccountInactive,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmailNotFound => "email not found",
            Self::WrongPassword => "wrong password",
            Self::AccountInactive => "account inactive",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginAttempt {
    pub id: LoginAttemptId,
    pub email: String,
    pub ip_address: String,
    pub user_agent: String,
    pub success: bool,
    pub fail_reason: Option<FailureReason>,
    pub attempted_at: DateTime<Utc>,
}

impl LoginAttempt {
    pub fn succeeded(email: impl Into<String>, client: &ClientContext) -> Self {
        Self::record(email.into(), client, None)
    }

    pub fn failed(email: impl Into<String>, client: &ClientContext, reason: FailureReason) -> Self {
        Self::record(email.into(), client, Some(reason))
    }

    fn record(email: String, client: &ClientContext, fail_reason: Option<FailureReason>) -> Self {
        Self {
            id: LoginAttemptId::new(),
            email,
            ip_address: client.ip_string(),
            user_agent: client.user_agent_string(),
            success: fail_reason.is_none(),
            fail_reason,
            attempted_at: Utc::now(),
        }
    }
}
