//! Refresh Token Use Case
//!
//! Rotates a refresh token. A token that is presented after it was revoked
//! means someone else holds a copy, so every session of its owner ends.
//!
//! Stored state decides the outcome. The presented string is only compared
//! against the store; its signature is never trusted on its own.

use std::sync::Arc;

use platform::client::ClientContext;

use crate::application::login::SessionTokens;
use crate::application::token_codec::TokenCodec;
use crate::domain::entity::RefreshToken;
use crate::domain::repository::{RefreshTokenRepository, UserRepository};
use crate::error::{AuthError, AuthResult};

pub struct RefreshTokenUseCase<U, R>
where
    U: UserRepository,
    R: RefreshTokenRepository,
{
    user_repo: Arc<U>,
    token_repo: Arc<R>,
    codec: Arc<TokenCodec>,
}

impl<U, R> RefreshTokenUseCase<U, R>
where
    U: UserRepository,
    R: RefreshTokenRepository,
{
    pub fn new(user_repo: Arc<U>, token_repo: Arc<R>, codec: Arc<TokenCodec>) -> Self {
        Self {
            user_repo,
            token_repo,
            codec,
        }
    }

    pub async fn execute(
        &self,
        presented: &str,
        client: &ClientContext,
    ) -> AuthResult<SessionTokens> {
        // 1. Reuse check runs before validity. A storage error here
        //    propagates instead of reading as "not reused".
        if let Some(revoked) = self.token_repo.find_revoked(presented).await? {
            return Err(self.handle_reuse(&revoked, client).await?);
        }

        // 2. Validity
        if !self.token_repo.is_valid(presented).await? {
            return Err(AuthError::TokenInvalid);
        }

        // 3. Owner
        let record = self
            .token_repo
            .find_by_token(presented)
            .await?
            .ok_or(AuthError::TokenNotFound)?;

        let user = self
            .user_repo
            .find_by_id(&record.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !user.is_active {
            return Err(AuthError::AccountInactive);
        }

        // 4. New pair
        let access_token =
            self.codec
                .generate_access_token(&user.user_id, &user.email, user.role_id)?;
        let refresh_token = self.codec.generate_refresh_token(&user.user_id)?;

        // 5. New record first, then a conditional revoke of the old one
        let replacement = RefreshToken::issue(
            refresh_token.token.clone(),
            user.user_id,
            refresh_token.expires_at,
            client,
        );
        if !self.token_repo.rotate(&replacement, presented).await? {
            tracing::warn!(
                user_id = %user.user_id,
                token_id = %record.id,
                "Refresh token was rotated concurrently"
            );
            return Err(AuthError::TokenInvalid);
        }

        tracing::info!(
            user_id = %user.user_id,
            old_token_id = %record.id,
            new_token_id = %replacement.id,
            "Refresh token rotated"
        );

        Ok(SessionTokens {
            access_token,
            refresh_token,
            user: user.profile(),
        })
    }

    async fn handle_reuse(
        &self,
        revoked: &RefreshToken,
        client: &ClientContext,
    ) -> AuthResult<AuthError> {
        let terminated = self.token_repo.revoke_all_for_user(&revoked.user_id).await?;

        tracing::error!(
            user_id = %revoked.user_id,
            token_id = %revoked.id,
            revoked_at = ?revoked.revoked_at,
            ip = %client.ip_string(),
            user_agent = %client.user_agent_string(),
            terminated_sessions = terminated,
            "SECURITY: revoked refresh token reused, all sessions terminated"
        );

        Ok(AuthError::ReuseDetected)
    }
}
