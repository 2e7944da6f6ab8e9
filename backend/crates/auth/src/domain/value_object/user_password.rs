//! User Password Value Objects
//!
//! Thin domain wrappers over `platform::password`.
//!
//! `RawPassword` is whatever the caller typed. Login never applies the
//! storage policy to it, so accounts created under older rules can still
//! sign in. `UserPassword` is the stored Argon2id hash.

use platform::password::{
    ClearTextPassword, HashedPassword, PasswordHashError, PasswordPolicyError,
};
use std::fmt;

// ============================================================================
// Raw Password (User Input)
// ============================================================================

/// Password as presented by the caller, zeroized on drop
pub struct RawPassword(ClearTextPassword);

impl RawPassword {
    /// Wrap login input without policy checks
    pub fn new(raw: impl Into<String>) -> Self {
        Self(ClearTextPassword::new(raw))
    }

    /// Wrap input destined for a new hash; the storage policy applies
    pub fn for_storage(raw: impl Into<String>) -> Result<Self, PasswordPolicyError> {
        let password = Self::new(raw);
        password.0.validate_for_storage()?;
        Ok(password)
    }

    /// Spend the cost of one verification against a throwaway hash
    pub fn equalize_timing(&self, pepper: Option<&[u8]>) {
        self.0.equalize_timing(pepper);
    }
}

impl fmt::Debug for RawPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawPassword").field(&"[REDACTED]").finish()
    }
}

// ============================================================================
// User Password (Hashed, for storage)
// ============================================================================

#[derive(Clone, PartialEq, Eq)]
pub struct UserPassword(HashedPassword);

impl UserPassword {
    pub fn hash(raw: &RawPassword, pepper: Option<&[u8]>) -> Result<Self, PasswordHashError> {
        raw.0.hash(pepper).map(Self)
    }

    /// Load a PHC string from the users table
    pub fn from_phc_string(phc_string: impl Into<String>) -> Result<Self, PasswordHashError> {
        HashedPassword::from_phc_string(phc_string).map(Self)
    }

    pub fn as_phc_string(&self) -> &str {
        self.0.as_phc_string()
    }

    /// Constant-time check; `pepper` must match the one used at hash time
    pub fn verify(&self, raw: &RawPassword, pepper: Option<&[u8]>) -> bool {
        self.0.verify(&raw.0, pepper)
    }
}

impl fmt::Debug for UserPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}
