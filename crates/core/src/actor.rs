//! # Actor Module
//!
//! Who performs an operation. Roles are recorded for the audit trail;
//! role-based authorization itself belongs to the caller.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric identity of a user
pub type UserId = i64;

/// Role of the acting user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Deposit and loan holder
    Client,
    /// Back-office staff, may cancel actions
    Operator,
    /// Approves and rejects loans
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Operator => "operator",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "client" => Some(Role::Client),
            "operator" => Some(Role::Operator),
            "manager" => Some(Role::Manager),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Staff roles (everything except client)
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Client)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The user on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn client(user_id: UserId) -> Self {
        Self::new(user_id, Role::Client)
    }

    pub fn operator(user_id: UserId) -> Self {
        Self::new(user_id, Role::Operator)
    }

    pub fn manager(user_id: UserId) -> Self {
        Self::new(user_id, Role::Manager)
    }

    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, Role::Admin)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.role, self.user_id)
    }
}
