//! Capability checks for catalog mutations.
//!
//! Every admin operation starts with [`authorize`]; the returned
//! [`Authorized`] value is only obtainable through that call.

use axum_helpers::JwtClaims;
use strum::Display;

use crate::error::{ProductError, ProductResult};

pub const ADMIN_ROLE: &str = "admin";

/// Caller identity as established by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>, email: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }
}

impl From<JwtClaims> for Actor {
    fn from(claims: JwtClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            roles: claims.roles,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    /// Create, update and delete products and their variants
    ManageCatalog,
}

impl Capability {
    fn granted_to(self, actor: &Actor) -> bool {
        match self {
            Capability::ManageCatalog => actor.is_admin(),
        }
    }
}

/// Proof that [`authorize`] succeeded for `capability`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authorized {
    capability: Capability,
}

impl Authorized {
    pub fn capability(&self) -> Capability {
        self.capability
    }
}

pub fn authorize(actor: &Actor, capability: Capability) -> ProductResult<Authorized> {
    if capability.granted_to(actor) {
        Ok(Authorized { capability })
    } else {
        tracing::warn!(actor_id = %actor.id, %capability, "Capability denied");
        Err(ProductError::Forbidden {
            actor: actor.id.clone(),
            capability: capability.to_string(),
        })
    }
}
