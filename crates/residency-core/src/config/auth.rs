//! Authentication configuration: how ID tokens are verified and how admin
//! sessions are signed.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::model::Role;

/// Google's public keys for Firebase ID tokens.
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Five days, the admin session lifetime.
pub const DEFAULT_SESSION_SECONDS: u64 = 60 * 60 * 24 * 5;

/// Upper bound on `auth.session.lifetime_seconds`: one year.
pub const MAX_SESSION_SECONDS: u64 = 60 * 60 * 24 * 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,

    /// Firebase project; the expected `aud` of every ID token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firebase_project_id: Option<String>,

    #[serde(default = "default_jwks_url")]
    pub jwks_url: String,

    /// Service-account identity, when the deployment carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firebase_client_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firebase_private_key: Option<String>,

    #[serde(default)]
    pub session: SessionConfig,

    /// Identities accepted in `static` mode, keyed by bearer token.
    #[serde(default)]
    pub static_users: Vec<StaticIdentity>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::default(),
            firebase_project_id: None,
            jwks_url: default_jwks_url(),
            firebase_client_email: None,
            firebase_private_key: None,
            session: SessionConfig::default(),
            static_users: Vec::new(),
        }
    }
}

/// How bearer ID tokens are verified.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// RS256 tokens checked against Google's JWKS.
    #[default]
    Firebase,
    /// Fixed token table from `static_users`. Development only.
    Static,
}

/// Admin session cookie settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    #[serde(default = "default_lifetime")]
    pub lifetime_seconds: u64,

    /// Add `Secure` to the cookie.
    #[serde(default)]
    pub secure: bool,

    /// Environment variable holding the hex Ed25519 signing key.
    #[serde(default = "default_key_env")]
    pub private_key_env: Option<String>,

    #[serde(default)]
    pub private_key_file: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            lifetime_seconds: default_lifetime(),
            secure: false,
            private_key_env: default_key_env(),
            private_key_file: None,
        }
    }
}

impl SessionConfig {
    /// Resolve the signing key from environment or file.
    pub fn resolve_private_key(&self) -> Result<Option<String>, std::io::Error> {
        if let Some(env_var) = &self.private_key_env
            && let Ok(key) = std::env::var(env_var)
            && !key.trim().is_empty()
        {
            return Ok(Some(key.trim().to_string()));
        }

        if let Some(path) = &self.private_key_file
            && path.exists()
        {
            let key = std::fs::read_to_string(path)?;
            return Ok(Some(key.trim().to_string()));
        }

        Ok(None)
    }
}

/// A development identity accepted in `static` mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StaticIdentity {
    pub token: String,
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Claim-level role. `admin` and `superAdmin` act as custom claims.
    #[serde(default)]
    pub role: Role,
}

fn default_jwks_url() -> String {
    FIREBASE_JWKS_URL.to_string()
}

fn default_cookie_name() -> String {
    "admin-session".to_string()
}

fn default_lifetime() -> u64 {
    DEFAULT_SESSION_SECONDS
}

fn default_key_env() -> Option<String> {
    Some("RESIDENCY_SESSION_KEY".to_string())
}
