//! Refresh Token Entity
//!
//! Lifecycle: issued -> active -> revoked (rotated, logged out or mass
//! revoked). A revoked token never becomes valid again; presenting one is
//! treated as theft.

use chrono::{DateTime, Utc};
use kernel::id::RefreshTokenId;
use platform::client::ClientContext;

use crate::domain::value_object::UserId;

#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub id: RefreshTokenId,
    /// Signed token string, unique across the store
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    /// Token string that superseded this one in a rotation
    pub replaced_by: Option<String>,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    pub fn issue(
        token: impl Into<String>,
        user_id: UserId,
        expires_at: DateTime<Utc>,
        client: &ClientContext,
    ) -> Self {
        Self {
            id: RefreshTokenId::new(),
            token: token.into(),
            user_id,
            expires_at,
            revoked: false,
            replaced_by: None,
            ip_address: client.ip_string(),
            user_agent: client.user_agent_string(),
            created_at: Utc::now(),
            revoked_at: None,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Revoke once. Returns `false` if already revoked; the original
    /// `replaced_by` and `revoked_at` are kept in that case.
    pub fn revoke(&mut self, replaced_by: Option<&str>) -> bool {
        if self.revoked {
            return false;
        }
        self.revoked = true;
        self.revoked_at = Some(Utc::now());
        self.replaced_by = replaced_by.map(str::to_owned);
        true
    }
}

/// What a user sees about one of their signed-in devices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: RefreshTokenId,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<&RefreshToken> for SessionInfo {
    fn from(token: &RefreshToken) -> Self {
        Self {
            id: token.id,
            ip_address: token.ip_address.clone(),
            user_agent: token.user_agent.clone(),
            created_at: token.created_at,
            expires_at: token.expires_at,
        }
    }
}
