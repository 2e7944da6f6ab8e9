//! Shared Kernel
//!
//! Types every backend crate agrees on: the client-facing
//! [`error::app_error::AppError`] and typed record ids.

pub mod error {
    pub mod app_error;
    pub mod kind;
    #[cfg(feature = "axum")]
    pub mod response;
}
pub mod id;
