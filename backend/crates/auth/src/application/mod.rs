//! Application Layer
//!
//! Use cases and application services.

pub mod config;
pub mod lockout;
pub mod login;
pub mod maintenance;
pub mod refresh_token;
pub mod revoke_token;
pub mod token_codec;

// Re-exports
pub use config::AuthConfig;
pub use lockout::LockoutRegistry;
pub use login::{LoginInput, LoginUseCase, SessionTokens};
pub use maintenance::{MaintenanceReport, MaintenanceUseCase};
pub use refresh_token::RefreshTokenUseCase;
pub use revoke_token::RevokeTokenUseCase;
pub use token_codec::{Claims, IssuedToken, TokenCodec, TokenType};
