//! Value Object Module

pub mod email;
pub mod role_id;
pub mod user_id;
pub mod user_password;

pub use email::{Email, EmailError};
pub use role_id::RoleId;
pub use user_id::UserId;
pub use user_password::{RawPassword, UserPassword};
