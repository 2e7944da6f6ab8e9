//! Maintenance Use Case
//!
//! Periodic housekeeping: purge dead refresh tokens and release lockouts
//! that have served their time.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::lockout::LockoutRegistry;
use crate::domain::repository::{
    AccountLockoutRepository, LoginAttemptRepository, RefreshTokenRepository,
};
use crate::error::AuthResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub expired_tokens_deleted: u64,
    pub revoked_tokens_deleted: u64,
    pub lockouts_released: u64,
}

pub struct MaintenanceUseCase<R, A, L>
where
    R: RefreshTokenRepository,
    A: LoginAttemptRepository,
    L: AccountLockoutRepository,
{
    token_repo: Arc<R>,
    lockouts: LockoutRegistry<A, L>,
    config: Arc<AuthConfig>,
}

impl<R, A, L> MaintenanceUseCase<R, A, L>
where
    R: RefreshTokenRepository,
    A: LoginAttemptRepository,
    L: AccountLockoutRepository,
{
    pub fn new(
        token_repo: Arc<R>,
        attempt_repo: Arc<A>,
        lockout_repo: Arc<L>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            token_repo,
            lockouts: LockoutRegistry::new(attempt_repo, lockout_repo),
            config,
        }
    }

    /// Delete expired tokens, then revoked tokens past retention.
    /// Returns `(expired, revoked)` counts.
    pub async fn cleanup_expired_tokens(&self) -> AuthResult<(u64, u64)> {
        let expired = self.token_repo.delete_expired().await?;
        let revoked = self
            .token_repo
            .delete_revoked_older_than(self.config.revoked_token_retention)
            .await?;
        Ok((expired, revoked))
    }

    pub async fn release_expired_lockouts(&self) -> AuthResult<u64> {
        self.lockouts
            .release_expired(self.config.lockout_duration)
            .await
    }

    pub async fn run(&self) -> AuthResult<MaintenanceReport> {
        let (expired_tokens_deleted, revoked_tokens_deleted) =
            self.cleanup_expired_tokens().await?;
        let lockouts_released = self.release_expired_lockouts().await?;

        let report = MaintenanceReport {
            expired_tokens_deleted,
            revoked_tokens_deleted,
            lockouts_released,
        };
        tracing::info!(
            expired_tokens_deleted,
            revoked_tokens_deleted,
            lockouts_released,
            "Auth maintenance completed"
        );
        Ok(report)
    }
}
