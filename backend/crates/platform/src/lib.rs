//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations for the backend crates:
//! - Password hashing (Argon2id PHC strings, zeroized clear text)
//! - JWT signing and verification behind a key provider
//! - Client identification from HTTP headers

pub mod client;
pub mod jwt;
pub mod password;
