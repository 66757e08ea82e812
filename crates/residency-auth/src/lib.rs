//! # residency-auth
//!
//! Identity verification and admin sessions.
//!
//! - [`FirebaseVerifier`] checks RS256 ID tokens against Google's JWKS
//! - [`StaticIdentityVerifier`] maps fixed bearer tokens to identities
//!   (development only)
//! - [`SessionIssuer`] mints five-day admin sessions as Biscuit tokens
//!   signed with an Ed25519 key

use std::sync::Arc;

use residency_core::{AuthConfig, AuthMode, SessionConfig};
use tracing::warn;

pub mod error;
pub mod firebase;
pub mod identity;
pub mod keys;
pub mod session;
pub mod static_verifier;

pub use error::AuthError;
pub use firebase::FirebaseVerifier;
pub use identity::{IdentityVerifier, RoleClaims, VerifiedIdentity};
pub use keys::KeyPair;
pub use session::{Session, SessionIssuer};
pub use static_verifier::StaticIdentityVerifier;

/// Build the verifier selected by `auth.mode`.
pub fn verifier_from_config(config: &AuthConfig) -> Result<Arc<dyn IdentityVerifier>, AuthError> {
    match config.mode {
        AuthMode::Firebase => {
            let project_id = config.firebase_project_id.clone().ok_or_else(|| {
                AuthError::NotConfigured("firebase_project_id is required".into())
            })?;
            Ok(Arc::new(FirebaseVerifier::new(
                project_id,
                config.jwks_url.clone(),
            )))
        }
        AuthMode::Static => {
            warn!(
                users = config.static_users.len(),
                "static identity verification enabled; do not use in production"
            );
            Ok(Arc::new(StaticIdentityVerifier::new(&config.static_users)))
        }
    }
}

/// Build the session issuer from the configured key, or a throwaway key
/// when none is set (sessions then die with the process).
pub fn session_issuer_from_config(config: &SessionConfig) -> Result<SessionIssuer, AuthError> {
    let keypair = match config.resolve_private_key()? {
        Some(hex) => KeyPair::from_private_key_hex(&hex)?,
        None => {
            warn!("no session key configured; generated an ephemeral key");
            KeyPair::generate()?
        }
    };
    Ok(SessionIssuer::new(keypair, config.lifetime_seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use residency_core::{Role, StaticIdentity};

    #[test]
    fn firebase_mode_needs_project() {
        let config = AuthConfig::default();
        assert!(matches!(
            verifier_from_config(&config),
            Err(AuthError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn static_mode_builds_table() {
        let config = AuthConfig {
            mode: AuthMode::Static,
            static_users: vec![StaticIdentity {
                token: "t".into(),
                uid: "u".into(),
                email: "u@example.com".into(),
                name: None,
                role: Role::Admin,
            }],
            ..Default::default()
        };
        let verifier = verifier_from_config(&config).unwrap();
        assert!(verifier.verify_id_token("t").await.unwrap().claims.admin);
    }

    #[test]
    fn issuer_uses_configured_key() {
        let keypair = KeyPair::generate().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.key");
        keypair.save_to_files(&path, None).unwrap();

        let config = SessionConfig {
            private_key_env: None,
            private_key_file: Some(path),
            ..Default::default()
        };
        let issuer = session_issuer_from_config(&config).unwrap();
        let identity = VerifiedIdentity {
            uid: "u".into(),
            email: None,
            name: None,
            claims: RoleClaims::default(),
        };
        let token = issuer.mint(&identity).unwrap().token;

        let same_key = SessionIssuer::new(
            KeyPair::from_private_key_hex(&keypair.private_key_hex()).unwrap(),
            60,
        );
        assert_eq!(same_key.verify(&token).unwrap().uid, "u");
    }
}
