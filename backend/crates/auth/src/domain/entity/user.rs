//! User Entity
//!
//! Credential record owned by the user store. The auth core only reads it
//! and bumps `last_login_at`; provisioning happens elsewhere.

use chrono::{DateTime, Utc};

use crate::domain::value_object::{Email, RoleId, UserId, UserPassword};

#[derive(Debug, Clone)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub email: Email,
    pub password_hash: UserPassword,
    pub role_id: RoleId,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: impl Into<String>,
        email: Email,
        password_hash: UserPassword,
        role_id: RoleId,
    ) -> Self {
        let now = Utc::now();

        Self {
            user_id: UserId::new(),
            username: username.into(),
            email,
            password_hash,
            role_id,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record successful login
    pub fn record_login(&mut self) {
        let now = Utc::now();
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }

    /// Copy without the password hash, safe to hand to callers
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            user_id: self.user_id,
            username: self.username.clone(),
            email: self.email.clone(),
            role_id: self.role_id,
            is_active: self.is_active,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Sanitized user returned from login and refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: UserId,
    pub username: String,
    pub email: Email,
    pub role_id: RoleId,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        user.profile()
    }
}
