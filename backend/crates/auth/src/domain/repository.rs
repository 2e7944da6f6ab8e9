//! Repository Traits
//!
//! Storage contracts the auth core depends on. Implementations live in the
//! infrastructure layer.

use chrono::{DateTime, Duration, Utc};

use crate::domain::entity::{AccountLockout, LoginAttempt, RefreshToken, User};
use crate::domain::value_object::{Email, UserId};
use crate::error::AuthResult;

/// Credential store (read mostly; provisioning is external)
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>>;

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>>;

    async fn update(&self, user: &User) -> AuthResult<()>;
}

/// Append-only login attempt ledger
#[trait_variant::make(LoginAttemptRepository: Send)]
pub trait LocalLoginAttemptRepository {
    async fn insert(&self, attempt: &LoginAttempt) -> AuthResult<()>;

    /// Failed attempts for `email` at or after `cutoff`
    async fn count_failed_since(&self, email: &str, cutoff: DateTime<Utc>) -> AuthResult<i64>;

    /// Failed attempts from `ip` at or after `cutoff`, across all emails
    async fn count_failed_by_ip_since(&self, ip: &str, cutoff: DateTime<Utc>) -> AuthResult<i64>;
}

#[trait_variant::make(AccountLockoutRepository: Send)]
pub trait LocalAccountLockoutRepository {
    /// Plain insert; existing active rows are left alone
    async fn insert(&self, lockout: &AccountLockout) -> AuthResult<()>;

    /// Most recent lockout for `email` that is still in force at `now`:
    /// active, and open-ended or unlocking after `now`
    async fn find_in_force(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<AccountLockout>>;

    /// Deactivate every active row for `email`, stamping `unlocked_at`
    async fn deactivate(&self, email: &str) -> AuthResult<u64>;

    /// Deactivate active rows locked before `cutoff`
    async fn deactivate_locked_before(&self, cutoff: DateTime<Utc>) -> AuthResult<u64>;
}

#[trait_variant::make(RefreshTokenRepository: Send)]
pub trait LocalRefreshTokenRepository {
    async fn insert(&self, token: &RefreshToken) -> AuthResult<()>;

    async fn find_by_token(&self, token: &str) -> AuthResult<Option<RefreshToken>>;

    /// The record for `token` only if it is already revoked
    async fn find_revoked(&self, token: &str) -> AuthResult<Option<RefreshToken>>;

    /// Not revoked and not expired
    async fn is_valid(&self, token: &str) -> AuthResult<bool>;

    /// Compare-and-set revoke: only an unrevoked row changes.
    /// Returns whether this call performed the revocation.
    async fn mark_revoked(&self, token: &str, replaced_by: Option<&str>) -> AuthResult<bool>;

    /// Atomically insert `new_token` then revoke `old_token` in its favour.
    ///
    /// If `old_token` was revoked concurrently nothing is written and
    /// `false` is returned.
    async fn rotate(&self, new_token: &RefreshToken, old_token: &str) -> AuthResult<bool>;

    async fn revoke_all_for_user(&self, user_id: &UserId) -> AuthResult<u64>;

    async fn delete_expired(&self) -> AuthResult<u64>;

    /// Delete revoked rows whose `revoked_at` is older than `age`
    async fn delete_revoked_older_than(&self, age: Duration) -> AuthResult<u64>;

    async fn count_active_for_user(&self, user_id: &UserId) -> AuthResult<i64>;

    /// Valid tokens for `user_id`, newest first
    async fn find_active_for_user(&self, user_id: &UserId) -> AuthResult<Vec<RefreshToken>>;
}

/// Everything the HTTP layer needs from one storage handle
pub trait AuthStore:
    UserRepository
    + LoginAttemptRepository
    + AccountLockoutRepository
    + RefreshTokenRepository
    + Send
    + Sync
    + 'static
{
}

impl<T> AuthStore for T where
    T: UserRepository
        + LoginAttemptRepository
        + AccountLockoutRepository
        + RefreshTokenRepository
        + Send
        + Sync
        + 'static
{
}
