//! Revoke Token Use Case
//!
//! Logout, logout everywhere, and the active session listing.

use std::sync::Arc;

use crate::domain::entity::SessionInfo;
use crate::domain::repository::RefreshTokenRepository;
use crate::domain::value_object::UserId;
use crate::error::AuthResult;

pub struct RevokeTokenUseCase<R>
where
    R: RefreshTokenRepository,
{
    token_repo: Arc<R>,
}

impl<R> RevokeTokenUseCase<R>
where
    R: RefreshTokenRepository,
{
    pub fn new(token_repo: Arc<R>) -> Self {
        Self { token_repo }
    }

    /// Revoke one token without a replacement
    ///
    /// Idempotent: unknown and already revoked tokens succeed.
    pub async fn revoke(&self, token: &str) -> AuthResult<()> {
        if self.token_repo.mark_revoked(token, None).await? {
            tracing::info!("Refresh token revoked");
        } else {
            tracing::debug!("Revoke requested for inactive or unknown token");
        }
        Ok(())
    }

    /// Revoke every unrevoked token of `user_id`, returning how many changed
    pub async fn revoke_all(&self, user_id: &UserId) -> AuthResult<u64> {
        let revoked = self.token_repo.revoke_all_for_user(user_id).await?;
        tracing::info!(user_id = %user_id, revoked, "All refresh tokens revoked");
        Ok(revoked)
    }

    pub async fn count_active(&self, user_id: &UserId) -> AuthResult<i64> {
        self.token_repo.count_active_for_user(user_id).await
    }

    /// Active sessions, newest first
    pub async fn list_active(&self, user_id: &UserId) -> AuthResult<Vec<SessionInfo>> {
        let tokens = self.token_repo.find_active_for_user(user_id).await?;
        Ok(tokens.iter().map(SessionInfo::from).collect())
    }
}
