//! Role reference carried in access tokens

use serde::{Deserialize, Serialize};
use std::fmt;

/// Foreign key into the roles table. Role semantics live outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(i32);

impl RoleId {
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    pub const fn value(self) -> i32 {
        self.0
    }
}

impl From<i32> for RoleId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
