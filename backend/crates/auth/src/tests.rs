//! Scenario tests for the auth use cases, run against an in-memory store

#[cfg(test)]
pub(crate) mod support {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex, MutexGuard};

    use chrono::{DateTime, Duration, Utc};
    use platform::client::ClientContext;

    use crate::application::{
        AuthConfig, LoginInput, LoginUseCase, MaintenanceUseCase, RefreshTokenUseCase,
        RevokeTokenUseCase, SessionTokens, TokenCodec,
    };
    use crate::domain::entity::{AccountLockout, LoginAttempt, RefreshToken, User};
    use crate::domain::repository::{
        AccountLockoutRepository, LoginAttemptRepository, RefreshTokenRepository, UserRepository,
    };
    use crate::domain::value_object::{Email, RawPassword, RoleId, UserId, UserPassword};
    use crate::error::{AuthError, AuthResult};

    pub const PASSWORD: &str = "correct horse battery";

    #[derive(Default)]
    struct State {
        users: HashMap<UserId, User>,
        attempts: Vec<LoginAttempt>,
        lockouts: Vec<AccountLockout>,
        tokens: Vec<RefreshToken>,
    }

    /// Implements every repository trait over one shared state
    #[derive(Clone, Default)]
    pub struct MemoryStore {
        state: Arc<Mutex<State>>,
        /// `UserRepository::update` fails while set
        pub fail_user_updates: Arc<AtomicBool>,
        /// `find_revoked` fails while set
        pub fail_token_reads: Arc<AtomicBool>,
        /// Next `rotate` sees its old token revoked by someone else
        pub steal_next_rotation: Arc<AtomicBool>,
    }

    impl MemoryStore {
        fn state(&self) -> MutexGuard<'_, State> {
            self.state.lock().unwrap()
        }

        pub fn add_user(&self, user: User) {
            self.state().users.insert(user.user_id, user);
        }

        pub fn user(&self, user_id: &UserId) -> Option<User> {
            self.state().users.get(user_id).cloned()
        }

        pub fn attempts_for(&self, email: &str) -> Vec<LoginAttempt> {
            self.state()
                .attempts
                .iter()
                .filter(|a| a.email == email)
                .cloned()
                .collect()
        }

        pub fn push_attempt(&self, attempt: LoginAttempt) {
            self.state().attempts.push(attempt);
        }

        pub fn active_lockouts(&self, email: &str) -> Vec<AccountLockout> {
            self.state()
                .lockouts
                .iter()
                .filter(|l| l.email == email && l.is_active)
                .cloned()
                .collect()
        }

        pub fn push_lockout(&self, lockout: AccountLockout) {
            self.state().lockouts.push(lockout);
        }

        pub fn token(&self, token: &str) -> Option<RefreshToken> {
            self.state().tokens.iter().find(|t| t.token == token).cloned()
        }

        pub fn push_token(&self, token: RefreshToken) {
            self.state().tokens.push(token);
        }

        pub fn token_count(&self) -> usize {
            self.state().tokens.len()
        }
    }

    impl UserRepository for MemoryStore {
        async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
            Ok(self
                .state()
                .users
                .values()
                .find(|u| u.email == *email)
                .cloned())
        }

        async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
            Ok(self.state().users.get(user_id).cloned())
        }

        async fn update(&self, user: &User) -> AuthResult<()> {
            if self.fail_user_updates.load(Ordering::SeqCst) {
                return Err(AuthError::Internal("user store unavailable".into()));
            }
            self.state().users.insert(user.user_id, user.clone());
            Ok(())
        }
    }

    impl LoginAttemptRepository for MemoryStore {
        async fn insert(&self, attempt: &LoginAttempt) -> AuthResult<()> {
            self.state().attempts.push(attempt.clone());
            Ok(())
        }

        async fn count_failed_since(&self, email: &str, cutoff: DateTime<Utc>) -> AuthResult<i64> {
            let count = self
                .state()
                .attempts
                .iter()
                .filter(|a| a.email == email && !a.success && a.attempted_at >= cutoff)
                .count();
            Ok(count as i64)
        }

        async fn count_failed_by_ip_since(
            &self,
            ip: &str,
            cutoff: DateTime<Utc>,
        ) -> AuthResult<i64> {
            let count = self
                .state()
                .attempts
                .iter()
                .filter(|a| a.ip_address == ip && !a.success && a.attempted_at >= cutoff)
                .count();
            Ok(count as i64)
        }
    }

    impl AccountLockoutRepository for MemoryStore {
        async fn insert(&self, lockout: &AccountLockout) -> AuthResult<()> {
            self.state().lockouts.push(lockout.clone());
            Ok(())
        }

        async fn find_in_force(
            &self,
            email: &str,
            now: DateTime<Utc>,
        ) -> AuthResult<Option<AccountLockout>> {
            Ok(self
                .state()
                .lockouts
                .iter()
                .filter(|l| l.email == email && l.is_in_force(now))
                .max_by_key(|l| l.locked_at)
                .cloned())
        }

        async fn deactivate(&self, email: &str) -> AuthResult<u64> {
            let mut released = 0;
            for lockout in self.state().lockouts.iter_mut() {
                if lockout.email == email && lockout.is_active {
                    lockout.release();
                    released += 1;
                }
            }
            Ok(released)
        }

        async fn deactivate_locked_before(&self, cutoff: DateTime<Utc>) -> AuthResult<u64> {
            let mut released = 0;
            for lockout in self.state().lockouts.iter_mut() {
                if lockout.is_active && lockout.locked_at < cutoff {
                    lockout.release();
                    released += 1;
                }
            }
            Ok(released)
        }
    }

    impl RefreshTokenRepository for MemoryStore {
        async fn insert(&self, token: &RefreshToken) -> AuthResult<()> {
            let mut state = self.state();
            if state.tokens.iter().any(|t| t.token == token.token) {
                return Err(AuthError::Internal("duplicate refresh token".into()));
            }
            state.tokens.push(token.clone());
            Ok(())
        }

        async fn find_by_token(&self, token: &str) -> AuthResult<Option<RefreshToken>> {
            Ok(self.token(token))
        }

        async fn find_revoked(&self, token: &str) -> AuthResult<Option<RefreshToken>> {
            if self.fail_token_reads.load(Ordering::SeqCst) {
                return Err(AuthError::Internal("token store unavailable".into()));
            }
            Ok(self.token(token).filter(|t| t.revoked))
        }

        async fn is_valid(&self, token: &str) -> AuthResult<bool> {
            Ok(self.token(token).is_some_and(|t| t.is_valid()))
        }

        async fn mark_revoked(&self, token: &str, replaced_by: Option<&str>) -> AuthResult<bool> {
            Ok(self
                .state()
                .tokens
                .iter_mut()
                .find(|t| t.token == token)
                .is_some_and(|t| t.revoke(replaced_by)))
        }

        async fn rotate(&self, new_token: &RefreshToken, old_token: &str) -> AuthResult<bool> {
            let mut state = self.state();

            if self.steal_next_rotation.swap(false, Ordering::SeqCst) {
                if let Some(old) = state.tokens.iter_mut().find(|t| t.token == old_token) {
                    old.revoke(None);
                }
            }

            if state.tokens.iter().any(|t| t.token == new_token.token) {
                return Err(AuthError::Internal("duplicate refresh token".into()));
            }
            let Some(old) = state
                .tokens
                .iter_mut()
                .find(|t| t.token == old_token && !t.revoked)
            else {
                return Ok(false);
            };
            old.revoke(Some(&new_token.token));
            state.tokens.push(new_token.clone());
            Ok(true)
        }

        async fn revoke_all_for_user(&self, user_id: &UserId) -> AuthResult<u64> {
            let mut revoked = 0;
            for token in self.state().tokens.iter_mut() {
                if token.user_id == *user_id && token.revoke(None) {
                    revoked += 1;
                }
            }
            Ok(revoked)
        }

        async fn delete_expired(&self) -> AuthResult<u64> {
            let now = Utc::now();
            let mut state = self.state();
            let before = state.tokens.len();
            state.tokens.retain(|t| t.expires_at >= now);
            Ok((before - state.tokens.len()) as u64)
        }

        async fn delete_revoked_older_than(&self, age: Duration) -> AuthResult<u64> {
            let cutoff = Utc::now() - age;
            let mut state = self.state();
            let before = state.tokens.len();
            state
                .tokens
                .retain(|t| !(t.revoked && t.revoked_at.is_some_and(|at| at < cutoff)));
            Ok((before - state.tokens.len()) as u64)
        }

        async fn count_active_for_user(&self, user_id: &UserId) -> AuthResult<i64> {
            let count = self
                .state()
                .tokens
                .iter()
                .filter(|t| t.user_id == *user_id && t.is_valid())
                .count();
            Ok(count as i64)
        }

        async fn find_active_for_user(&self, user_id: &UserId) -> AuthResult<Vec<RefreshToken>> {
            let mut tokens: Vec<RefreshToken> = self
                .state()
                .tokens
                .iter()
                .filter(|t| t.user_id == *user_id && t.is_valid())
                .cloned()
                .collect();
            tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(tokens)
        }
    }

    pub fn user(email: &str) -> User {
        let hash = UserPassword::hash(&RawPassword::new(PASSWORD), None).unwrap();
        User::new("tester", Email::parse(email).unwrap(), hash, RoleId::new(1))
    }

    pub fn client() -> ClientContext {
        ClientContext::new(
            Some("203.0.113.10".parse().unwrap()),
            Some("test-agent/1.0".to_string()),
        )
    }

    /// A refresh token row for `user_id` that the codec never issued
    pub fn stored_token(user_id: UserId, ttl: Duration) -> RefreshToken {
        RefreshToken::issue(
            uuid::Uuid::new_v4().to_string(),
            user_id,
            Utc::now() + ttl,
            &client(),
        )
    }

    pub struct Harness {
        pub store: MemoryStore,
        pub config: Arc<AuthConfig>,
        pub codec: Arc<TokenCodec>,
    }

    impl Harness {
        pub fn new() -> Self {
            let config = AuthConfig::with_random_secret();
            let codec = TokenCodec::from_config(&config);
            Self {
                store: MemoryStore::default(),
                config: Arc::new(config),
                codec: Arc::new(codec),
            }
        }

        /// Register an active user with [`PASSWORD`]
        pub fn with_user(&self, email: &str) -> User {
            let user = user(email);
            self.store.add_user(user.clone());
            user
        }

        pub async fn login(&self, email: &str, password: &str) -> AuthResult<SessionTokens> {
            let store = Arc::new(self.store.clone());
            let use_case = LoginUseCase::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store,
                self.codec.clone(),
                self.config.clone(),
            );
            let input = LoginInput {
                email: email.to_string(),
                password: password.to_string(),
            };
            use_case.execute(input, &client()).await
        }

        pub async fn refresh(&self, token: &str) -> AuthResult<SessionTokens> {
            let store = Arc::new(self.store.clone());
            RefreshTokenUseCase::new(store.clone(), store, self.codec.clone())
                .execute(token, &client())
                .await
        }

        /// Let detached tasks (last-login writes) run to completion
        pub async fn settle(&self) {
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
        }

        pub fn revoke_use_case(&self) -> RevokeTokenUseCase<MemoryStore> {
            RevokeTokenUseCase::new(Arc::new(self.store.clone()))
        }

        pub fn maintenance(&self) -> MaintenanceUseCase<MemoryStore, MemoryStore, MemoryStore> {
            let store = Arc::new(self.store.clone());
            MaintenanceUseCase::new(store.clone(), store.clone(), store, self.config.clone())
        }
    }
}

#[cfg(test)]
mod login_tests {
    use super::support::*;
    use chrono::{Duration, Utc};

    use crate::domain::entity::account_lockout::REASON_FAILED_ATTEMPTS;
    use crate::domain::entity::{AccountLockout, FailureReason, LoginAttempt};
    use crate::error::AuthError;

    #[tokio::test]
    async fn test_successful_login() {
        let h = Harness::new();
        let user = h.with_user("alice@example.com");

        let tokens = h.login("alice@example.com", PASSWORD).await.unwrap();

        assert_eq!(tokens.user.user_id, user.user_id);
        assert!(tokens.user.last_login_at.is_some());
        assert_ne!(tokens.access_token.token, tokens.refresh_token.token);

        let record = h.store.token(&tokens.refresh_token.token).unwrap();
        assert_eq!(record.user_id, user.user_id);
        assert_eq!(record.ip_address, "203.0.113.10");
        assert_eq!(record.user_agent, "test-agent/1.0");
        assert!(record.is_valid());

        let attempts = h.store.attempts_for("alice@example.com");
        assert_eq!(attempts.len(), 1);
        assert!(attempts[0].success);
    }

    #[tokio::test]
    async fn test_access_token_carries_identity() {
        let h = Harness::new();
        let user = h.with_user("alice@example.com");

        let tokens = h.login("alice@example.com", PASSWORD).await.unwrap();
        let claims = h.codec.validate_access_token(&tokens.access_token.token).unwrap();

        assert_eq!(claims.user_id(), Some(user.user_id));
        assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
        assert_eq!(claims.role_id, Some(1));
    }

    #[tokio::test]
    async fn test_email_is_normalized() {
        let h = Harness::new();
        h.with_user("alice@example.com");

        assert!(h.login("  Alice@Example.COM ", PASSWORD).await.is_ok());
        assert_eq!(h.store.attempts_for("alice@example.com").len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_email_matches_wrong_password() {
        let h = Harness::new();
        h.with_user("alice@example.com");

        let unknown = h.login("nobody@example.com", PASSWORD).await.unwrap_err();
        let wrong = h.login("alice@example.com", "not the password").await.unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.status_code(), wrong.status_code());

        let unknown_attempts = h.store.attempts_for("nobody@example.com");
        assert_eq!(unknown_attempts.len(), 1);
        assert_eq!(unknown_attempts[0].fail_reason, Some(FailureReason::EmailNotFound));

        let wrong_attempts = h.store.attempts_for("alice@example.com");
        assert_eq!(wrong_attempts[0].fail_reason, Some(FailureReason::WrongPassword));
    }

    #[tokio::test]
    async fn test_malformed_email_is_invalid_credentials() {
        let h = Harness::new();

        let err = h.login("not-an-email", PASSWORD).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(h.store.attempts_for("not-an-email").len(), 1);
    }

    #[tokio::test]
    async fn test_fifth_failure_locks_account() {
        let h = Harness::new();
        let user = h.with_user("locked@test.com");

        for _ in 0..4 {
            let err = h.login("locked@test.com", "wrong").await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }

        let err = h.login("locked@test.com", "wrong").await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::AccountLocked { retry_after_minutes: Some(30) }
        ));

        let lockouts = h.store.active_lockouts("locked@test.com");
        assert_eq!(lockouts.len(), 1);
        assert_eq!(lockouts[0].failed_count, 5);
        assert_eq!(lockouts[0].user_id, user.user_id);
        assert_eq!(lockouts[0].reason, REASON_FAILED_ATTEMPTS);
        assert!(lockouts[0].unlocked_at.is_none());
    }

    #[tokio::test]
    async fn test_locked_account_rejects_correct_password() {
        let h = Harness::new();
        h.with_user("locked@test.com");

        for _ in 0..5 {
            let _ = h.login("locked@test.com", "wrong").await;
        }

        let err = h.login("locked@test.com", PASSWORD).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked { .. }));

        // Blocked requests are not ledger entries
        assert_eq!(h.store.attempts_for("locked@test.com").len(), 5);
        assert_eq!(h.store.active_lockouts("locked@test.com").len(), 1);
    }

    #[tokio::test]
    async fn test_login_after_unlock_succeeds() {
        let h = Harness::new();
        h.with_user("locked@test.com");

        for _ in 0..5 {
            let _ = h.login("locked@test.com", "wrong").await;
        }
        assert!(h.login("locked@test.com", PASSWORD).await.is_err());

        h.maintenance_unlock("locked@test.com").await;

        // Old failures are still inside the window but the lockout is gone
        assert!(h.login("locked@test.com", PASSWORD).await.is_ok());
        assert!(h.store.active_lockouts("locked@test.com").is_empty());
    }

    #[tokio::test]
    async fn test_future_unlock_reports_remaining_minutes() {
        let h = Harness::new();
        let user = h.with_user("alice@example.com");

        let mut lockout =
            AccountLockout::new(user.user_id, "alice@example.com", "manual", 0);
        lockout.unlocked_at = Some(Utc::now() + Duration::minutes(10));
        h.store.push_lockout(lockout);

        let err = h.login("alice@example.com", PASSWORD).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::AccountLocked { retry_after_minutes: Some(10) }
        ));
    }

    #[tokio::test]
    async fn test_lapsed_unlock_time_does_not_block() {
        let h = Harness::new();
        let user = h.with_user("alice@example.com");

        let mut lockout =
            AccountLockout::new(user.user_id, "alice@example.com", "manual", 0);
        lockout.unlocked_at = Some(Utc::now() - Duration::minutes(1));
        h.store.push_lockout(lockout);

        assert!(h.login("alice@example.com", PASSWORD).await.is_ok());
        // Success path deactivates the stale row
        assert!(h.store.active_lockouts("alice@example.com").is_empty());
    }

    #[tokio::test]
    async fn test_older_open_ended_lockout_still_blocks() {
        let h = Harness::new();
        let user = h.with_user("alice@example.com");

        let mut automatic = AccountLockout::new(
            user.user_id,
            "alice@example.com",
            REASON_FAILED_ATTEMPTS,
            5,
        );
        automatic.locked_at = Utc::now() - Duration::minutes(5);
        h.store.push_lockout(automatic);

        // Newer row whose unlock time has already passed
        let mut manual = AccountLockout::new(user.user_id, "alice@example.com", "manual", 0);
        manual.unlocked_at = Some(Utc::now() - Duration::minutes(1));
        h.store.push_lockout(manual);

        let err = h.login("alice@example.com", PASSWORD).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::AccountLocked { retry_after_minutes: None }
        ));
        assert_eq!(h.store.active_lockouts("alice@example.com").len(), 2);
    }

    #[tokio::test]
    async fn test_failures_outside_window_not_counted() {
        let h = Harness::new();
        h.with_user("alice@example.com");

        for _ in 0..4 {
            let mut attempt = LoginAttempt::failed(
                "alice@example.com",
                &client(),
                FailureReason::WrongPassword,
            );
            attempt.attempted_at = Utc::now() - Duration::minutes(20);
            h.store.push_attempt(attempt);
        }

        let err = h.login("alice@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(h.store.active_lockouts("alice@example.com").is_empty());
    }

    #[tokio::test]
    async fn test_inactive_account() {
        let h = Harness::new();
        let mut user = user("idle@example.com");
        user.deactivate();
        h.store.add_user(user);

        let err = h.login("idle@example.com", PASSWORD).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountInactive));

        let attempts = h.store.attempts_for("idle@example.com");
        assert_eq!(attempts[0].fail_reason, Some(FailureReason::AccountInactive));
        assert_eq!(h.store.token_count(), 0);
    }

    #[tokio::test]
    async fn test_inactive_account_wrong_password_stays_generic() {
        let h = Harness::new();
        let mut user = user("idle@example.com");
        user.deactivate();
        h.store.add_user(user);

        let err = h.login("idle@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_last_login_is_persisted_in_background() {
        let h = Harness::new();
        let user = h.with_user("alice@example.com");

        h.login("alice@example.com", PASSWORD).await.unwrap();
        h.settle().await;

        assert!(h.store.user(&user.user_id).unwrap().last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_last_login_failure_does_not_fail_login() {
        let h = Harness::new();
        let user = h.with_user("alice@example.com");
        h.store
            .fail_user_updates
            .store(true, std::sync::atomic::Ordering::SeqCst);

        assert!(h.login("alice@example.com", PASSWORD).await.is_ok());

        h.settle().await;
        assert!(h.store.user(&user.user_id).unwrap().last_login_at.is_none());
    }

    impl Harness {
        async fn maintenance_unlock(&self, email: &str) {
            use crate::application::LockoutRegistry;
            use std::sync::Arc;

            let store = Arc::new(self.store.clone());
            let registry = LockoutRegistry::new(store.clone(), store);
            registry.unlock(email).await.unwrap();
            assert!(!registry.is_locked(email).await.unwrap());
        }
    }
}

#[cfg(test)]
mod refresh_tests {
    use super::support::*;
    use chrono::Duration;
    use std::sync::atomic::Ordering;

    use crate::error::AuthError;

    #[tokio::test]
    async fn test_rotation_issues_new_token() {
        let h = Harness::new();
        let user = h.with_user("u1@example.com");

        let first = h.login("u1@example.com", PASSWORD).await.unwrap();
        let second = h.refresh(&first.refresh_token.token).await.unwrap();

        assert_ne!(second.refresh_token.token, first.refresh_token.token);
        assert_eq!(second.user.user_id, user.user_id);

        let old = h.store.token(&first.refresh_token.token).unwrap();
        assert!(old.revoked);
        assert!(old.revoked_at.is_some());
        assert_eq!(old.replaced_by.as_deref(), Some(second.refresh_token.token.as_str()));

        assert!(h.store.token(&second.refresh_token.token).unwrap().is_valid());
    }

    #[tokio::test]
    async fn test_reuse_terminates_all_sessions() {
        let h = Harness::new();
        let user = h.with_user("u1@example.com");
        let revoke = h.revoke_use_case();

        let first = h.login("u1@example.com", PASSWORD).await.unwrap();
        let other_device = h.login("u1@example.com", PASSWORD).await.unwrap();
        let second = h.refresh(&first.refresh_token.token).await.unwrap();
        assert_eq!(revoke.count_active(&user.user_id).await.unwrap(), 2);

        let err = h.refresh(&first.refresh_token.token).await.unwrap_err();
        assert!(matches!(err, AuthError::ReuseDetected));

        assert_eq!(revoke.count_active(&user.user_id).await.unwrap(), 0);
        assert!(!h.store.token(&second.refresh_token.token).unwrap().is_valid());
        assert!(!h.store.token(&other_device.refresh_token.token).unwrap().is_valid());

        // The rotated-to token is now revoked too, so it reads as reuse
        let err = h.refresh(&second.refresh_token.token).await.unwrap_err();
        assert!(matches!(err, AuthError::ReuseDetected));
    }

    #[tokio::test]
    async fn test_expired_token_is_invalid_not_reuse() {
        let h = Harness::new();
        let user = h.with_user("u1@example.com");
        let expired = stored_token(user.user_id, Duration::minutes(-1));
        h.store.push_token(expired.clone());

        let err = h.refresh(&expired.token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn test_unknown_token_is_invalid() {
        let h = Harness::new();

        let err = h.refresh("never-issued").await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn test_inactive_user_cannot_refresh() {
        let h = Harness::new();
        let mut user = h.with_user("u1@example.com");
        let tokens = h.login("u1@example.com", PASSWORD).await.unwrap();
        h.settle().await;

        user.deactivate();
        h.store.add_user(user);

        let err = h.refresh(&tokens.refresh_token.token).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountInactive));
        // Nothing rotated
        assert!(h.store.token(&tokens.refresh_token.token).unwrap().is_valid());
    }

    #[tokio::test]
    async fn test_missing_user() {
        let h = Harness::new();
        let orphan = stored_token(crate::domain::value_object::UserId::new(), Duration::days(1));
        h.store.push_token(orphan.clone());

        let err = h.refresh(&orphan.token).await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }

    #[tokio::test]
    async fn test_lost_rotation_race_is_invalid() {
        let h = Harness::new();
        h.with_user("u1@example.com");
        let tokens = h.login("u1@example.com", PASSWORD).await.unwrap();
        let before = h.store.token_count();

        h.store.steal_next_rotation.store(true, Ordering::SeqCst);
        let err = h.refresh(&tokens.refresh_token.token).await.unwrap_err();

        assert!(matches!(err, AuthError::TokenInvalid));
        // The losing request wrote no new token
        assert_eq!(h.store.token_count(), before);
    }

    #[tokio::test]
    async fn test_reuse_check_failure_is_not_fail_open() {
        let h = Harness::new();
        h.with_user("u1@example.com");
        let tokens = h.login("u1@example.com", PASSWORD).await.unwrap();

        h.store.fail_token_reads.store(true, Ordering::SeqCst);
        let err = h.refresh(&tokens.refresh_token.token).await.unwrap_err();

        assert!(matches!(err, AuthError::Internal(_)));
        assert!(h.store.token(&tokens.refresh_token.token).unwrap().is_valid());
    }
}

#[cfg(test)]
mod revoke_tests {
    use super::support::*;

    use crate::error::AuthError;

    #[tokio::test]
    async fn test_revoke_all_user_tokens() {
        let h = Harness::new();
        let user = h.with_user("u1@example.com");
        let revoke = h.revoke_use_case();

        for _ in 0..3 {
            h.login("u1@example.com", PASSWORD).await.unwrap();
        }
        assert_eq!(revoke.count_active(&user.user_id).await.unwrap(), 3);

        assert_eq!(revoke.revoke_all(&user.user_id).await.unwrap(), 3);
        assert_eq!(revoke.count_active(&user.user_id).await.unwrap(), 0);

        // Already revoked rows are not counted twice
        assert_eq!(revoke.revoke_all(&user.user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let h = Harness::new();
        h.with_user("u1@example.com");
        let revoke = h.revoke_use_case();
        let tokens = h.login("u1@example.com", PASSWORD).await.unwrap();

        revoke.revoke(&tokens.refresh_token.token).await.unwrap();
        revoke.revoke(&tokens.refresh_token.token).await.unwrap();
        revoke.revoke("never-issued").await.unwrap();

        let record = h.store.token(&tokens.refresh_token.token).unwrap();
        assert!(record.revoked);
        assert!(record.replaced_by.is_none());
    }

    #[tokio::test]
    async fn test_logged_out_token_reuse_is_detected() {
        let h = Harness::new();
        h.with_user("u1@example.com");
        let tokens = h.login("u1@example.com", PASSWORD).await.unwrap();

        h.revoke_use_case()
            .revoke(&tokens.refresh_token.token)
            .await
            .unwrap();

        let err = h.refresh(&tokens.refresh_token.token).await.unwrap_err();
        assert!(matches!(err, AuthError::ReuseDetected));
    }

    #[tokio::test]
    async fn test_list_active_newest_first() {
        let h = Harness::new();
        let user = h.with_user("u1@example.com");
        let revoke = h.revoke_use_case();

        let first = h.login("u1@example.com", PASSWORD).await.unwrap();
        let second = h.login("u1@example.com", PASSWORD).await.unwrap();
        revoke.revoke(&first.refresh_token.token).await.unwrap();
        let third = h.login("u1@example.com", PASSWORD).await.unwrap();

        let sessions = revoke.list_active(&user.user_id).await.unwrap();
        assert_eq!(sessions.len(), 2);

        let newest = h.store.token(&third.refresh_token.token).unwrap();
        let older = h.store.token(&second.refresh_token.token).unwrap();
        assert_eq!(sessions[0].id, newest.id);
        assert_eq!(sessions[1].id, older.id);
        assert_eq!(sessions[0].ip_address, "203.0.113.10");
    }
}

#[cfg(test)]
mod maintenance_tests {
    use super::support::*;
    use chrono::{Duration, Utc};

    use crate::domain::entity::AccountLockout;

    #[tokio::test]
    async fn test_cleanup_expired_tokens() {
        let h = Harness::new();
        let user = h.with_user("u1@example.com");

        h.store.push_token(stored_token(user.user_id, Duration::minutes(-5)));

        let mut stale = stored_token(user.user_id, Duration::days(1));
        stale.revoke(None);
        stale.revoked_at = Some(Utc::now() - Duration::days(31));
        h.store.push_token(stale);

        let mut recent = stored_token(user.user_id, Duration::days(1));
        recent.revoke(None);
        h.store.push_token(recent.clone());

        let live = stored_token(user.user_id, Duration::days(1));
        h.store.push_token(live.clone());

        let (expired, revoked) = h.maintenance().cleanup_expired_tokens().await.unwrap();
        assert_eq!((expired, revoked), (1, 1));

        // Recently revoked rows stay for reuse detection
        assert!(h.store.token(&recent.token).is_some());
        assert!(h.store.token(&live.token).is_some());
        assert_eq!(h.store.token_count(), 2);
    }

    #[tokio::test]
    async fn test_release_expired_lockouts() {
        let h = Harness::new();
        let user = h.with_user("u1@example.com");

        let mut old = AccountLockout::new(user.user_id, "old@example.com", "test", 5);
        old.locked_at = Utc::now() - Duration::minutes(31);
        h.store.push_lockout(old);
        h.store
            .push_lockout(AccountLockout::new(user.user_id, "new@example.com", "test", 5));

        let report = h.maintenance().run().await.unwrap();
        assert_eq!(report.lockouts_released, 1);

        assert!(h.store.active_lockouts("old@example.com").is_empty());
        assert_eq!(h.store.active_lockouts("new@example.com").len(), 1);
    }
}

#[cfg(test)]
mod router_tests {
    use super::support::*;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::extract::ConnectInfo;
    use axum::http::{Request, StatusCode, header};
    use std::net::SocketAddr;
    use tower::ServiceExt;

    use crate::application::AuthConfig;
    use crate::presentation::router::auth_router_generic;

    fn app(store: MemoryStore) -> Router {
        auth_router_generic(store, AuthConfig::with_random_secret())
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        let mut req = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
        req
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_login_then_list_sessions() {
        let store = MemoryStore::default();
        store.add_user(user("alice@example.com"));
        let app = app(store);

        let response = app
            .clone()
            .oneshot(post_json(
                "/login",
                serde_json::json!({ "email": "alice@example.com", "password": PASSWORD }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["tokenType"], "Bearer");
        assert_eq!(body["user"]["email"], "alice@example.com");
        assert!(body["user"].get("passwordHash").is_none());
        let access = body["accessToken"].as_str().unwrap().to_string();

        let response = app
            .oneshot(
                Request::get("/sessions")
                    .header(header::AUTHORIZATION, format!("Bearer {access}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["activeSessions"], 1);
        assert_eq!(body["sessions"][0]["ipAddress"], "127.0.0.1");
    }

    #[tokio::test]
    async fn test_wrong_password_is_problem_json() {
        let store = MemoryStore::default();
        store.add_user(user("alice@example.com"));

        let response = app(store)
            .oneshot(post_json(
                "/login",
                serde_json::json!({ "email": "alice@example.com", "password": "nope" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_requires_token() {
        let response = app(MemoryStore::default())
            .oneshot(post_json("/refresh", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_logout_returns_no_content() {
        let response = app(MemoryStore::default())
            .oneshot(post_json(
                "/logout",
                serde_json::json!({ "refreshToken": "unknown" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_protected_routes_require_bearer() {
        let app = app(MemoryStore::default());

        let response = app
            .clone()
            .oneshot(Request::get("/sessions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::post("/logout-all")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
