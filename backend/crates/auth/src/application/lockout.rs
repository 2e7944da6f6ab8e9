//! Lockout Registry
//!
//! Brute-force bookkeeping over the attempt ledger and the lockout table.
//! Attempts and lockouts are keyed by the normalized email string, so an
//! address that matches no account is still counted.

use std::sync::Arc;

use chrono::{Duration, Utc};
use platform::client::ClientContext;

use crate::domain::entity::{AccountLockout, FailureReason, LoginAttempt};
use crate::domain::repository::{AccountLockoutRepository, LoginAttemptRepository};
use crate::domain::value_object::UserId;
use crate::error::AuthResult;

pub struct LockoutRegistry<A, L>
where
    A: LoginAttemptRepository,
    L: AccountLockoutRepository,
{
    attempt_repo: Arc<A>,
    lockout_repo: Arc<L>,
}

impl<A, L> LockoutRegistry<A, L>
where
    A: LoginAttemptRepository,
    L: AccountLockoutRepository,
{
    pub fn new(attempt_repo: Arc<A>, lockout_repo: Arc<L>) -> Self {
        Self {
            attempt_repo,
            lockout_repo,
        }
    }

    pub async fn record_success(&self, email: &str, client: &ClientContext) -> AuthResult<()> {
        self.attempt_repo
            .insert(&LoginAttempt::succeeded(email, client))
            .await
    }

    pub async fn record_failure(
        &self,
        email: &str,
        client: &ClientContext,
        reason: FailureReason,
    ) -> AuthResult<()> {
        self.attempt_repo
            .insert(&LoginAttempt::failed(email, client, reason))
            .await
    }

    /// Failures for `email` in the trailing `window`
    pub async fn count_recent_failures(&self, email: &str, window: Duration) -> AuthResult<i64> {
        self.attempt_repo
            .count_failed_since(email, Utc::now() - window)
            .await
    }

    /// Failures from `ip` in the trailing `window`, across all emails
    pub async fn count_recent_failures_by_ip(&self, ip: &str, window: Duration) -> AuthResult<i64> {
        self.attempt_repo
            .count_failed_by_ip_since(ip, Utc::now() - window)
            .await
    }

    /// The lockout currently blocking `email`, if any
    pub async fn active_lockout(&self, email: &str) -> AuthResult<Option<AccountLockout>> {
        self.lockout_repo.find_in_force(email, Utc::now()).await
    }

    pub async fn is_locked(&self, email: &str) -> AuthResult<bool> {
        Ok(self.active_lockout(email).await?.is_some())
    }

    /// Insert a new active lockout. Earlier active rows are not touched.
    pub async fn lock(
        &self,
        user_id: &UserId,
        email: &str,
        reason: &str,
        failed_count: i64,
    ) -> AuthResult<AccountLockout> {
        let failed_count = i32::try_from(failed_count).unwrap_or(i32::MAX);
        let lockout = AccountLockout::new(*user_id, email, reason, failed_count);
        self.lockout_repo.insert(&lockout).await?;

        tracing::warn!(
            user_id = %user_id,
            email = %email,
            failed_count,
            "Account locked after repeated failures"
        );
        Ok(lockout)
    }

    /// Release every active lockout for `email`; no-op when none exist
    pub async fn unlock(&self, email: &str) -> AuthResult<()> {
        let released = self.lockout_repo.deactivate(email).await?;
        if released > 0 {
            tracing::info!(email = %email, released, "Account lockout released");
        }
        Ok(())
    }

    /// Release lockouts that have run for at least `duration`
    pub async fn release_expired(&self, duration: Duration) -> AuthResult<u64> {
        self.lockout_repo
            .deactivate_locked_before(Utc::now() - duration)
            .await
    }
}
