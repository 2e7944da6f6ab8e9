//! Application Configuration
//!
//! Configuration for the Auth application layer.

use chrono::Duration;
use std::fmt;

/// Shortest signing secret accepted for HS256
pub const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Clone)]
pub struct AuthConfig {
    /// Access token lifetime (15 minutes)
    pub access_token_ttl: Duration,
    /// Refresh token lifetime (7 days)
    pub refresh_token_ttl: Duration,
    /// Failed logins within `failure_window` that trigger a lockout
    pub max_failed_attempts: u32,
    /// Trailing window for counting failures (15 minutes)
    pub failure_window: Duration,
    /// Cool-down announced to a locked user and used for auto-release (30 minutes)
    pub lockout_duration: Duration,
    /// How long revoked tokens stay around for reuse detection (30 days)
    pub revoked_token_retention: Duration,
    /// Period of the background cleanup task (1 hour)
    pub maintenance_interval: std::time::Duration,
    /// Period of the lockout auto-release tick (1 minute). Bounds how far a
    /// lockout can overrun `lockout_duration`.
    pub lockout_release_interval: std::time::Duration,
    /// HS256 signing secret
    pub jwt_secret: Vec<u8>,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::days(7),
            max_failed_attempts: 5,
            failure_window: Duration::minutes(15),
            lockout_duration: Duration::minutes(30),
            revoked_token_retention: Duration::days(30),
            maintenance_interval: std::time::Duration::from_secs(3600),
            lockout_release_interval: std::time::Duration::from_secs(60),
            jwt_secret: Vec::new(),
            password_pepper: None,
        }
    }
}

impl AuthConfig {
    /// Create config with a random signing secret
    ///
    /// Tokens do not survive a restart with this config.
    pub fn with_random_secret() -> Self {
        use rand::RngCore;
        let mut secret = vec![0u8; MIN_JWT_SECRET_LEN];
        rand::rng().fill_bytes(&mut secret);
        Self {
            jwt_secret: secret,
            ..Default::default()
        }
    }

    /// Create config for development (random secret, frequent cleanup)
    pub fn development() -> Self {
        Self {
            maintenance_interval: std::time::Duration::from_secs(300),
            ..Self::with_random_secret()
        }
    }

    pub fn has_usable_secret(&self) -> bool {
        self.jwt_secret.len() >= MIN_JWT_SECRET_LEN
    }

    /// Lockout duration in whole minutes, for user-facing messages
    pub fn lockout_minutes(&self) -> i64 {
        self.lockout_duration.num_minutes()
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("max_failed_attempts", &self.max_failed_attempts)
            .field("failure_window", &self.failure_window)
            .field("lockout_duration", &self.lockout_duration)
            .field("revoked_token_retention", &self.revoked_token_retention)
            .field("maintenance_interval", &self.maintenance_interval)
            .field("lockout_release_interval", &self.lockout_release_interval)
            .field("jwt_secret", &"[REDACTED]")
            .field("password_pepper", &self.password_pepper.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
