//! JWT Signing and Verification
//!
//! HS256 tokens signed with a process-wide shared secret. The secret is
//! only reachable through a [`KeyProvider`], so rotation (sign with the new
//! key, keep verifying with the old one) can be added without touching the
//! code that issues tokens.

use std::fmt;
use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use zeroize::Zeroizing;

/// Source of key material for signing and verification
pub trait KeyProvider: Send + Sync {
    /// Key used to sign newly issued tokens
    fn signing_key(&self) -> &[u8];

    /// Keys accepted when verifying, current key first
    fn verification_keys(&self) -> Vec<&[u8]> {
        vec![self.signing_key()]
    }
}

/// Single fixed secret held in zeroized memory
pub struct StaticKeyProvider {
    secret: Zeroizing<Vec<u8>>,
}

impl StaticKeyProvider {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
        }
    }
}

impl KeyProvider for StaticKeyProvider {
    fn signing_key(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for StaticKeyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticKeyProvider")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JwtError {
    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Token is malformed")]
    Malformed,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// HS256 signer/verifier
#[derive(Clone)]
pub struct JwtSigner {
    keys: Arc<dyn KeyProvider>,
    validation: Validation,
}

impl JwtSigner {
    pub fn new(keys: Arc<dyn KeyProvider>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Self { keys, validation }
    }

    pub fn sign<C: Serialize>(&self, claims: &C) -> Result<String, JwtError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.keys.signing_key()),
        )
        .map_err(|e| JwtError::Signing(e.to_string()))
    }

    /// Verify signature and expiry, returning the decoded claims
    pub fn verify<C: DeserializeOwned>(&self, token: &str) -> Result<C, JwtError> {
        let mut last_error = JwtError::InvalidSignature;

        for key in self.keys.verification_keys() {
            match decode::<C>(token, &DecodingKey::from_secret(key), &self.validation) {
                Ok(data) => return Ok(data.claims),
                Err(e) => {
                    let mapped = map_error(&e);
                    // Only a signature mismatch is worth retrying with an older key
                    if mapped != JwtError::InvalidSignature {
                        return Err(mapped);
                    }
                    last_error = mapped;
                }
            }
        }

        Err(last_error)
    }
}

impl fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSigner").finish_non_exhaustive()
    }
}

fn map_error(err: &jsonwebtoken::errors::Error) -> JwtError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::Malformed,
    }
}
