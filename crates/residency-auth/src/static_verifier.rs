//! Fixed token table for local development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use residency_core::StaticIdentity;

use crate::error::AuthError;
use crate::identity::{IdentityVerifier, RoleClaims, VerifiedIdentity};

pub struct StaticIdentityVerifier {
    identities: HashMap<String, VerifiedIdentity>,
}

impl StaticIdentityVerifier {
    pub fn new(users: &[StaticIdentity]) -> Self {
        let identities = users
            .iter()
            .map(|u| {
                (
                    u.token.clone(),
                    VerifiedIdentity {
                        uid: u.uid.clone(),
                        email: Some(u.email.clone()),
                        name: u.name.clone(),
                        claims: RoleClaims::from_role(u.role),
                    },
                )
            })
            .collect();
        Self { identities }
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        self.identities
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken("unknown token".into()))
    }
}
