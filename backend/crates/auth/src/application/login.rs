//! Login Use Case
//!
//! Password login with brute-force lockout. The step order is the security
//! policy: lockout check, user lookup, password check, active flag, then
//! token issuance. Every step records a ledger entry except the lockout
//! short-circuit.

use std::sync::Arc;

use platform::client::ClientContext;

use crate::application::config::AuthConfig;
use crate::application::lockout::LockoutRegistry;
use crate::application::token_codec::{IssuedToken, TokenCodec};
use crate::domain::entity::account_lockout::REASON_FAILED_ATTEMPTS;
use crate::domain::entity::{FailureReason, RefreshToken, User, UserProfile};
use crate::domain::repository::{
    AccountLockoutRepository, LoginAttemptRepository, RefreshTokenRepository, UserRepository,
};
use crate::domain::value_object::{Email, RawPassword, email};
use crate::error::{AuthError, AuthResult};

pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Token pair plus the sanitized user, returned by login and refresh
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: IssuedToken,
    pub refresh_token: IssuedToken,
    pub user: UserProfile,
}

pub struct LoginUseCase<U, A, L, R>
where
    U: UserRepository + Send + Sync + 'static,
    A: LoginAttemptRepository,
    L: AccountLockoutRepository,
    R: RefreshTokenRepository,
{
    user_repo: Arc<U>,
    token_repo: Arc<R>,
    lockouts: LockoutRegistry<A, L>,
    codec: Arc<TokenCodec>,
    config: Arc<AuthConfig>,
}

impl<U, A, L, R> LoginUseCase<U, A, L, R>
where
    U: UserRepository + Send + Sync + 'static,
    A: LoginAttemptRepository,
    L: AccountLockoutRepository,
    R: RefreshTokenRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        attempt_repo: Arc<A>,
        lockout_repo: Arc<L>,
        token_repo: Arc<R>,
        codec: Arc<TokenCodec>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            user_repo,
            token_repo,
            lockouts: LockoutRegistry::new(attempt_repo, lockout_repo),
            codec,
            config,
        }
    }

    pub async fn execute(
        &self,
        input: LoginInput,
        client: &ClientContext,
    ) -> AuthResult<SessionTokens> {
        let email = email::normalize(&input.email);
        let password = RawPassword::new(input.password);
        let pepper = self.config.pepper();

        // 1. Existing lockout: not logged as a new attempt
        if let Some(lockout) = self.lockouts.active_lockout(&email).await? {
            tracing::warn!(
                email = %email,
                locked_at = %lockout.locked_at,
                ip = %client.ip_string(),
                "Login blocked by active lockout"
            );
            return Err(AuthError::AccountLocked {
                retry_after_minutes: lockout.remaining_minutes(chrono::Utc::now()),
            });
        }

        // 2. Unknown email: same outcome and similar cost as a wrong password
        let Some(user) = self.find_user(&email).await? else {
            password.equalize_timing(pepper);
            self.lockouts
                .record_failure(&email, client, FailureReason::EmailNotFound)
                .await?;
            return Err(AuthError::InvalidCredentials);
        };

        // 3. Password
        if !user.password_hash.verify(&password, pepper) {
            return Err(self.handle_wrong_password(&user, &email, client).await?);
        }

        // 4. Active flag, checked only after the password matched
        if !user.is_active {
            self.lockouts
                .record_failure(&email, client, FailureReason::AccountInactive)
                .await?;
            tracing::warn!(user_id = %user.user_id, "Login to inactive account");
            return Err(AuthError::AccountInactive);
        }

        // 5. Success
        self.lockouts.record_success(&email, client).await?;
        self.lockouts.unlock(&email).await?;

        let access_token =
            self.codec
                .generate_access_token(&user.user_id, &user.email, user.role_id)?;
        let refresh_token = self.codec.generate_refresh_token(&user.user_id)?;

        let record = RefreshToken::issue(
            refresh_token.token.clone(),
            user.user_id,
            refresh_token.expires_at,
            client,
        );
        self.token_repo.insert(&record).await?;

        let mut user = user;
        user.record_login();
        self.update_last_login(user.clone());

        tracing::info!(
            user_id = %user.user_id,
            ip = %client.ip_string(),
            "User logged in"
        );

        Ok(SessionTokens {
            access_token,
            refresh_token,
            user: user.profile(),
        })
    }

    async fn find_user(&self, email: &str) -> AuthResult<Option<User>> {
        // A malformed address cannot belong to an account
        match Email::parse(email) {
            Ok(email) => self.user_repo.find_by_email(&email).await,
            Err(_) => Ok(None),
        }
    }

    /// Record the failure and decide between a lockout and a plain rejection
    async fn handle_wrong_password(
        &self,
        user: &User,
        email: &str,
        client: &ClientContext,
    ) -> AuthResult<AuthError> {
        self.lockouts
            .record_failure(email, client, FailureReason::WrongPassword)
            .await?;

        let failures = self
            .lockouts
            .count_recent_failures(email, self.config.failure_window)
            .await?;

        if failures < i64::from(self.config.max_failed_attempts) {
            return Ok(AuthError::InvalidCredentials);
        }

        self.lockouts
            .lock(&user.user_id, email, REASON_FAILED_ATTEMPTS, failures)
            .await?;

        if let Some(ip) = client.ip {
            let ip_failures = self
                .lockouts
                .count_recent_failures_by_ip(&ip.to_string(), self.config.failure_window)
                .await?;
            tracing::warn!(ip = %ip, ip_failures, "Failed logins from lockout source");
        }

        Ok(AuthError::AccountLocked {
            retry_after_minutes: Some(self.config.lockout_minutes()),
        })
    }

    /// Best effort: a failed write is logged and never fails the login
    fn update_last_login(&self, user: User) {
        let user_repo = Arc::clone(&self.user_repo);
        tokio::spawn(async move {
            if let Err(e) = user_repo.update(&user).await {
                tracing::warn!(
                    user_id = %user.user_id,
                    error = %e,
                    "Failed to update last login"
                );
            }
        });
    }
}
