//! Token Codec
//!
//! Issues and validates the signed JWTs handed to clients. Signing keys come
//! from a [`KeyProvider`], never from the codec itself.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use platform::jwt::{JwtError, JwtSigner, KeyProvider, StaticKeyProvider};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::config::AuthConfig;
use crate::domain::value_object::{Email, RoleId, UserId};
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User UUID
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<i32>,
    /// Per-issuance id, refresh tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    pub typ: TokenType,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Option<UserId> {
        UserId::parse(&self.sub).ok()
    }
}

/// A freshly signed token and the instant it stops being accepted
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TokenCodec {
    signer: JwtSigner,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    pub fn new(keys: Arc<dyn KeyProvider>, config: &AuthConfig) -> Self {
        Self {
            signer: JwtSigner::new(keys),
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
        }
    }

    /// Codec keyed by the single secret in `config`
    pub fn from_config(config: &AuthConfig) -> Self {
        let keys = Arc::new(StaticKeyProvider::new(config.jwt_secret.clone()));
        Self::new(keys, config)
    }

    pub fn generate_access_token(
        &self,
        user_id: &UserId,
        email: &Email,
        role_id: RoleId,
    ) -> AuthResult<IssuedToken> {
        self.issue(self.access_ttl, |iat, exp| Claims {
            sub: user_id.to_string(),
            email: Some(email.as_str().to_owned()),
            role_id: Some(role_id.value()),
            jti: None,
            typ: TokenType::Access,
            iat,
            exp,
        })
    }

    pub fn generate_refresh_token(&self, user_id: &UserId) -> AuthResult<IssuedToken> {
        self.issue(self.refresh_ttl, |iat, exp| Claims {
            sub: user_id.to_string(),
            email: None,
            role_id: None,
            jti: Some(Uuid::new_v4().to_string()),
            typ: TokenType::Refresh,
            iat,
            exp,
        })
    }

    /// Signature and expiry check for either token type
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.signer.verify(token)
    }

    /// Validate a bearer token, rejecting refresh tokens
    pub fn validate_access_token(&self, token: &str) -> AuthResult<Claims> {
        let claims = self.validate_token(token).map_err(|e| {
            tracing::debug!(error = %e, "Access token rejected");
            AuthError::Unauthorized
        })?;

        if claims.typ != TokenType::Access {
            tracing::debug!(typ = ?claims.typ, "Non-access token presented as bearer");
            return Err(AuthError::Unauthorized);
        }
        Ok(claims)
    }

    fn issue(
        &self,
        ttl: Duration,
        build: impl FnOnce(i64, i64) -> Claims,
    ) -> AuthResult<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + ttl;
        let claims = build(now.timestamp(), expires_at.timestamp());

        let token = self
            .signer
            .sign(&claims)
            .map_err(|e| AuthError::TokenGenerationFailed(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }
}
