//! Request authentication and role gates.
//!
//! Credentials are tried in order: `Authorization: Bearer <ID token>`, then
//! the admin session cookie. The resolved [`Principal`] carries the verified
//! identity, the matching user record (if any) and the effective role, which
//! is the higher of the token's claims and the stored role.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use residency_auth::{AuthError, VerifiedIdentity};
use residency_core::{Role, SessionConfig, User};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Roles allowed on `/api/admin/*`.
pub const ADMIN_ROLES: &[Role] = &[Role::Admin, Role::SuperAdmin];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Bearer,
    Session,
}

#[derive(Debug, Clone)]
pub struct Principal {
    pub identity: VerifiedIdentity,
    pub user: Option<User>,
    pub role: Role,
    pub source: CredentialSource,
}

/// What to do when the user lookup hits a store outage.
#[derive(Clone, Copy)]
enum Lookup {
    /// Carry on with claims alone.
    BestEffort,
    Required,
}

impl Principal {
    async fn resolve(parts: &Parts, state: &AppState, lookup: Lookup) -> ApiResult<Self> {
        let (identity, source) = authenticate(&parts.headers, state).await?;

        let user = match state.services().users.find_by_firebase_uid(&identity.uid).await {
            Ok(user) => user,
            Err(e) if e.is_unavailable() && matches!(lookup, Lookup::BestEffort) => {
                warn!(uid = %identity.uid, error = %e, "user lookup failed; using token claims only");
                None
            }
            Err(e) => return Err(e.into()),
        };

        let role = effective_role(&identity, user.as_ref());
        Ok(Self {
            identity,
            user,
            role,
            source,
        })
    }

    /// 403 unless the effective role is one of `allowed`.
    pub fn require_role(&self, allowed: &[Role]) -> ApiResult<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            debug!(uid = %self.identity.uid, role = %self.role, "role not allowed");
            Err(ApiError::Forbidden("insufficient permissions".into()))
        }
    }

    /// The caller's user record id, when one exists.
    pub fn user_id(&self) -> Option<Uuid> {
        self.user.as_ref().map(|u| u.id)
    }
}

/// The higher of the token's claims and the stored role.
pub fn effective_role(identity: &VerifiedIdentity, user: Option<&User>) -> Role {
    identity
        .claims
        .role()
        .into_iter()
        .chain(user.map(|u| u.role))
        .max()
        .unwrap_or(Role::User)
}

async fn authenticate(
    headers: &HeaderMap,
    state: &AppState,
) -> ApiResult<(VerifiedIdentity, CredentialSource)> {
    let mut failure: Option<AuthError> = None;

    if let Some(token) = bearer_token(headers) {
        match state.verifier().verify_id_token(token).await {
            Ok(identity) => return Ok((identity, CredentialSource::Bearer)),
            Err(e) => {
                debug!(error = %e, "bearer token rejected");
                failure = Some(e);
            }
        }
    }

    if let Some(token) = cookie(headers, &state.session_config().cookie_name) {
        match state.sessions().verify(token) {
            Ok(identity) => return Ok((identity, CredentialSource::Session)),
            Err(e) => {
                debug!(error = %e, "session cookie rejected");
                failure = Some(e);
            }
        }
    }

    Err(match failure {
        Some(err) => err.into(),
        None => ApiError::Unauthorized("authentication required".into()),
    })
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Value of the named cookie, across every `Cookie` header.
pub fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|v| !v.is_empty())
}

/// `Set-Cookie` value carrying a fresh session.
pub fn session_cookie(config: &SessionConfig, token: &str) -> String {
    let mut cookie = format!(
        "{}={token}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        config.cookie_name, config.lifetime_seconds
    );
    if config.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session.
pub fn cleared_session_cookie(config: &SessionConfig) -> String {
    let mut cookie = format!(
        "{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax",
        config.cookie_name
    );
    if config.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Any authenticated caller whose effective role is `admin` or `superAdmin`.
pub struct AdminPrincipal(pub Principal);

impl FromRequestParts<AppState> for AdminPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let principal = Principal::resolve(parts, state, Lookup::BestEffort).await?;
        principal.require_role(ADMIN_ROLES)?;
        Ok(Self(principal))
    }
}

/// An authenticated caller with a user record.
pub struct Learner {
    pub principal: Principal,
    pub user: User,
}

impl FromRequestParts<AppState> for Learner {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let principal = Principal::resolve(parts, state, Lookup::Required).await?;
        let Some(user) = principal.user.clone() else {
            return Err(ApiError::Unauthorized(
                "no account is registered for this identity".into(),
            ));
        };
        Ok(Self { principal, user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;
    use residency_auth::RoleClaims;

    fn identity(claims: RoleClaims) -> VerifiedIdentity {
        VerifiedIdentity {
            uid: "uid-1".into(),
            email: None,
            name: None,
            claims,
        }
    }

    fn user(role: Role) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            firebase_uid: "uid-1".into(),
            email: "a@example.com".into(),
            display_name: "A".into(),
            role,
            credits: 0,
            bio: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn effective_role_takes_the_higher() {
        let admin_claims = RoleClaims {
            admin: true,
            super_admin: false,
        };
        assert_eq!(effective_role(&identity(RoleClaims::default()), None), Role::User);
        assert_eq!(
            effective_role(&identity(RoleClaims::default()), Some(&user(Role::Mentor))),
            Role::Mentor
        );
        assert_eq!(
            effective_role(&identity(admin_claims), Some(&user(Role::Mentor))),
            Role::Admin
        );
        assert_eq!(
            effective_role(&identity(admin_claims), Some(&user(Role::SuperAdmin))),
            Role::SuperAdmin
        );
    }

    #[test]
    fn reads_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; admin-session=abc123"));
        headers.append(COOKIE, HeaderValue::from_static("other=1"));
        assert_eq!(cookie(&headers, "admin-session"), Some("abc123"));
        assert_eq!(cookie(&headers, "other"), Some("1"));
        assert_eq!(cookie(&headers, "missing"), None);
    }

    #[test]
    fn reads_bearer() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer  tok "));
        assert_eq!(bearer_token(&headers), Some("tok"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn cookie_attributes() {
        let mut config = SessionConfig::default();
        assert_eq!(
            session_cookie(&config, "t"),
            "admin-session=t; Path=/; Max-Age=432000; HttpOnly; SameSite=Lax"
        );
        config.secure = true;
        assert!(session_cookie(&config, "t").ends_with("; Secure"));
        assert!(cleared_session_cookie(&config).contains("Max-Age=0"));
    }
}
