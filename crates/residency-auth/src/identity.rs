//! Verified identities and the verifier seam.

use async_trait::async_trait;
use residency_core::Role;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Role claims carried by an identity token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleClaims {
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub super_admin: bool,
}

impl RoleClaims {
    pub fn from_role(role: Role) -> Self {
        Self {
            admin: role == Role::Admin,
            super_admin: role == Role::SuperAdmin,
        }
    }

    /// The highest role the claims grant, if any.
    pub fn role(&self) -> Option<Role> {
        if self.super_admin {
            Some(Role::SuperAdmin)
        } else if self.admin {
            Some(Role::Admin)
        } else {
            None
        }
    }

    pub fn is_admin(&self) -> bool {
        self.admin || self.super_admin
    }
}

/// An identity whose token has been checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub claims: RoleClaims,
}

impl VerifiedIdentity {
    /// Role granted by claims alone; `user` when there are none.
    pub fn claimed_role(&self) -> Role {
        self.claims.role().unwrap_or(Role::User)
    }
}

/// Checks an identity provider token.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedIdentity, AuthError>;
}
