//! The authenticated caller of a workflow.
//!
//! Every workflow takes an explicit `Actor`; nothing reads a global
//! "current user". The role is trusted as supplied by the session layer.

use crate::error::{Error, Result};
use crate::orm::users;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Unknown role strings are treated as plain users.
    pub fn from_str(s: &str) -> Self {
        match s {
            "admin" => Self::Admin,
            _ => Self::User,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i32,
    pub role: Role,
}

impl Actor {
    pub fn new(id: i32, role: Role) -> Self {
        Self { id, role }
    }

    pub fn user(id: i32) -> Self {
        Self::new(id, Role::User)
    }

    pub fn admin(id: i32) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Require admin role. Returns () or `Error::Authorization`.
    pub fn require_admin(&self) -> Result<()> {
        if !self.is_admin() {
            log::warn!("User {} attempted an admin-only action", self.id);
            return Err(Error::Authorization("Admin role required".to_string()));
        }
        Ok(())
    }

    /// Require that the actor owns a resource. Returns () or `Error::Authorization`.
    pub fn require_owner(&self, owner_id: i32) -> Result<()> {
        if self.id != owner_id {
            return Err(Error::Authorization(
                "You don't own this resource".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<&users::Model> for Actor {
    fn from(user: &users::Model) -> Self {
        Self::new(user.id, Role::from_str(&user.role))
    }
}
