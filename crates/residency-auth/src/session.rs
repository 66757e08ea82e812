//! Admin session tokens.
//!
//! A session is a Biscuit whose authority block carries the identity facts
//! (`user`, `email`, `name`, `role`) and a time check. Sessions are
//! self-contained; nothing is stored server side.

use crate::error::AuthError;
use crate::identity::{RoleClaims, VerifiedIdentity};
use crate::keys::KeyPair;
use biscuit_auth::builder::AuthorizerBuilder;
use biscuit_auth::macros::{check, fact};
use biscuit_auth::{Authorizer, Biscuit};
use chrono::{DateTime, Duration, Utc};
use residency_core::Role;
use residency_core::config::auth::MAX_SESSION_SECONDS;

/// A freshly minted session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Mints and verifies admin sessions with one keypair.
pub struct SessionIssuer {
    keypair: KeyPair,
    lifetime: Duration,
}

impl SessionIssuer {
    /// `lifetime_seconds` is capped at [`MAX_SESSION_SECONDS`].
    pub fn new(keypair: KeyPair, lifetime_seconds: u64) -> Self {
        let seconds = lifetime_seconds.min(MAX_SESSION_SECONDS) as i64;
        Self {
            keypair,
            lifetime: Duration::seconds(seconds),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn mint(&self, identity: &VerifiedIdentity) -> Result<Session, AuthError> {
        self.mint_at(identity, Utc::now())
    }

    fn mint_at(
        &self,
        identity: &VerifiedIdentity,
        issued_at: DateTime<Utc>,
    ) -> Result<Session, AuthError> {
        let expires_at = issued_at + self.lifetime;
        let err = |e: biscuit_auth::error::Token| AuthError::SessionCreationFailed(e.to_string());

        let mut builder = Biscuit::builder()
            .fact(fact!("user({uid})", uid = identity.uid.clone()))
            .map_err(err)?
            .fact(fact!(
                "role({role})",
                role = identity.claimed_role().as_str().to_string()
            ))
            .map_err(err)?
            .fact(fact!("issued_at({ts})", ts = issued_at.timestamp()))
            .map_err(err)?
            .fact(fact!("expires_at({ts})", ts = expires_at.timestamp()))
            .map_err(err)?
            .check(check!(
                "check if time($time), $time < {expires_at}",
                expires_at = expires_at.timestamp()
            ))
            .map_err(err)?;

        if let Some(email) = &identity.email {
            builder = builder
                .fact(fact!("email({email})", email = email.clone()))
                .map_err(err)?;
        }
        if let Some(name) = &identity.name {
            builder = builder
                .fact(fact!("name({name})", name = name.clone()))
                .map_err(err)?;
        }

        let token = builder
            .build(self.keypair.inner())
            .map_err(err)?
            .to_base64()
            .map_err(err)?;

        Ok(Session { token, expires_at })
    }

    /// Check the signature and expiry, then read the identity back.
    pub fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        self.verify_at(token, Utc::now())
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedIdentity, AuthError> {
        let biscuit = Biscuit::from_base64(token, self.keypair.public_key())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let now = now.timestamp();
        let mut authorizer = AuthorizerBuilder::new()
            .code(format!(
                r#"
                time({now});
                allow if true;
                "#
            ))
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?
            .build(&biscuit)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let expires_at = query_int(&mut authorizer, "expires_at")?;
        if now >= expires_at {
            return Err(AuthError::Expired);
        }

        authorizer
            .authorize()
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let uid = query_string(&mut authorizer, "user")?.ok_or_else(|| AuthError::MissingClaim {
            claim: "user".to_string(),
        })?;
        let role = query_string(&mut authorizer, "role")?
            .and_then(|r| r.parse::<Role>().ok())
            .unwrap_or(Role::User);

        Ok(VerifiedIdentity {
            uid,
            email: query_string(&mut authorizer, "email")?,
            name: query_string(&mut authorizer, "name")?,
            claims: RoleClaims::from_role(role),
        })
    }
}

fn query_string(authorizer: &mut Authorizer, name: &str) -> Result<Option<String>, AuthError> {
    let rule = format!("data($x) <- {name}($x)");
    let results: Vec<(String,)> = authorizer
        .query(rule.as_str())
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
    Ok(results.into_iter().next().map(|(s,)| s))
}

fn query_int(authorizer: &mut Authorizer, name: &str) -> Result<i64, AuthError> {
    let rule = format!("data($x) <- {name}($x)");
    let results: Vec<(i64,)> = authorizer
        .query(rule.as_str())
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
    results
        .into_iter()
        .next()
        .map(|(v,)| v)
        .ok_or_else(|| AuthError::MissingClaim {
            claim: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use residency_core::config::auth::DEFAULT_SESSION_SECONDS;

    fn admin() -> VerifiedIdentity {
        VerifiedIdentity {
            uid: "uid-admin".into(),
            email: Some("admin@example.com".into()),
            name: None,
            claims: RoleClaims {
                admin: true,
                super_admin: false,
            },
        }
    }

    fn issuer() -> SessionIssuer {
        SessionIssuer::new(KeyPair::generate().unwrap(), DEFAULT_SESSION_SECONDS)
    }

    #[test]
    fn mint_then_verify_keeps_identity() {
        let issuer = issuer();
        let session = issuer.mint(&admin()).unwrap();
        let identity = issuer.verify(&session.token).unwrap();
        assert_eq!(identity, admin());
    }

    #[test]
    fn session_lasts_five_days() {
        let issuer = issuer();
        let now = Utc::now();
        let session = issuer.mint_at(&admin(), now).unwrap();
        assert_eq!((session.expires_at - now).num_seconds(), 432_000);

        assert!(issuer.verify_at(&session.token, now + Duration::days(4)).is_ok());
        assert!(matches!(
            issuer.verify_at(&session.token, now + Duration::days(5)),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn oversized_lifetime_is_capped() {
        let issuer = SessionIssuer::new(KeyPair::generate().unwrap(), u64::MAX);
        assert_eq!(issuer.lifetime(), Duration::days(365));
        assert!(issuer.mint(&admin()).is_ok());
    }

    #[test]
    fn foreign_key_is_rejected() {
        let session = issuer().mint(&admin()).unwrap();
        assert!(matches!(
            issuer().verify(&session.token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            issuer().verify("not-a-token"),
            Err(AuthError::InvalidToken(_))
        ));
    }
}
