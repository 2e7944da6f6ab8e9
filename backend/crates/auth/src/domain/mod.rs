//! Domain Layer
//!
//! Contains entities, value objects, and repository traits.

pub mod entity;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{AccountLockout, LoginAttempt, RefreshToken, User, UserProfile};
pub use repository::{
    AccountLockoutRepository, AuthStore, LoginAttemptRepository, RefreshTokenRepository,
    UserRepository,
};
