//! Authenticated user identity.

use serde::{Deserialize, Serialize};

use super::id::UserId;
use super::status::UserRole;

/// The signed-in user as reported by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
}

impl User {
    /// Any non-buyer account can switch to the seller dashboard.
    #[must_use]
    pub fn is_seller(&self) -> bool {
        self.role != UserRole::Buyer
    }
}
