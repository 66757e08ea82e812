//! Configuration types for the Residency platform.
//!
//! Configuration is read from a single YAML file (`residency.yaml`) and then
//! overlaid with environment variables, so a deployment can run from
//! environment alone:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `DATABASE_URL`, `MONGODB_URI` | database connection string (first one set wins) |
//! | `FIREBASE_PROJECT_ID` | expected ID-token audience |
//! | `FIREBASE_CLIENT_EMAIL`, `FIREBASE_PRIVATE_KEY` | service-account identity |
//! | `RESIDENCY_SESSION_KEY` | admin session signing key (hex) |
//! | `DEBUG_SEED_SECRET` | enables `/api/debug/*` behind this secret |
//! | `RESIDENCY_BIND` | listen address |

pub mod auth;
pub mod database;
pub mod server;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use auth::{AuthConfig, AuthMode, SessionConfig, StaticIdentity};
pub use database::DatabaseConfig;
pub use server::ServerConfig;

/// Complete configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResidencyConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub debug: DebugConfig,
}

/// Debug-only routes.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DebugConfig {
    /// Shared secret expected in `x-debug-secret`. Unset disables the routes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_secret: Option<String>,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ResidencyConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Overlay process environment variables.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay variables from an arbitrary lookup.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("DATABASE_URL").or_else(|| get("MONGODB_URI")) {
            self.database.url = Some(url);
        }
        if let Some(project) = get("FIREBASE_PROJECT_ID") {
            self.auth.firebase_project_id = Some(project);
        }
        if let Some(email) = get("FIREBASE_CLIENT_EMAIL") {
            self.auth.firebase_client_email = Some(email);
        }
        if let Some(key) = get("FIREBASE_PRIVATE_KEY") {
            // Deployment dashboards store the PEM with literal "\n" sequences.
            self.auth.firebase_private_key = Some(key.replace("\\n", "\n"));
        }
        if let Some(secret) = get("DEBUG_SEED_SECRET") {
            self.debug.seed_secret = Some(secret);
        }
        if let Some(bind) = get("RESIDENCY_BIND") {
            self.server.bind = bind;
        }
    }

    /// Load a file (when given), then overlay the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Config(format!(
                "server.bind '{}' is not a socket address",
                self.server.bind
            )));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Config(
                "database.max_connections must be at least 1".into(),
            ));
        }
        match self.auth.mode {
            AuthMode::Firebase => {
                if self
                    .auth
                    .firebase_project_id
                    .as_deref()
                    .is_none_or(|p| p.trim().is_empty())
                {
                    return Err(ConfigError::Config(
                        "auth.firebase_project_id (or FIREBASE_PROJECT_ID) is required in firebase mode"
                            .into(),
                    ));
                }
            }
            AuthMode::Static => {
                if self.auth.static_users.is_empty() {
                    return Err(ConfigError::Config(
                        "auth.static_users must list at least one identity in static mode".into(),
                    ));
                }
            }
        }
        if self.auth.session.lifetime_seconds == 0 {
            return Err(ConfigError::Config(
                "auth.session.lifetime_seconds must be positive".into(),
            ));
        }
        if self.auth.session.lifetime_seconds > auth::MAX_SESSION_SECONDS {
            return Err(ConfigError::Config(format!(
                "auth.session.lifetime_seconds must be at most {}",
                auth::MAX_SESSION_SECONDS
            )));
        }
        Ok(())
    }

    /// A copy safe to print: secrets masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.database.url = self.database.redacted_url();
        copy.database.url_env = None;
        if copy.auth.firebase_private_key.is_some() {
            copy.auth.firebase_private_key = Some("***".into());
        }
        if copy.debug.seed_secret.is_some() {
            copy.debug.seed_secret = Some("***".into());
        }
        for user in &mut copy.auth.static_users {
            user.token = "***".into();
        }
        copy
    }
}
