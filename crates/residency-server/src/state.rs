//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use residency_auth::{
    AuthError, IdentityVerifier, SessionIssuer, session_issuer_from_config, verifier_from_config,
};
use residency_core::{ResidencyConfig, ServerConfig, SessionConfig};
use residency_runtime::{Services, Store};

use crate::cache::ListingCache;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    services: Services,
    verifier: Arc<dyn IdentityVerifier>,
    sessions: SessionIssuer,
    session_config: SessionConfig,
    server: ServerConfig,
    debug_secret: Option<String>,
    cache: ListingCache,
}

impl AppState {
    pub fn new(
        config: &ResidencyConfig,
        store: Store,
        verifier: Arc<dyn IdentityVerifier>,
        sessions: SessionIssuer,
    ) -> Self {
        let ttl = Duration::from_secs(config.server.listing_cache_ttl_seconds);
        Self {
            inner: Arc::new(AppStateInner {
                services: Services::new(store),
                verifier,
                sessions,
                session_config: config.auth.session.clone(),
                server: config.server.clone(),
                debug_secret: config
                    .debug
                    .seed_secret
                    .clone()
                    .filter(|s| !s.trim().is_empty()),
                cache: ListingCache::new(ttl),
            }),
        }
    }

    /// Build the verifier and session issuer the configuration asks for.
    pub fn from_config(config: &ResidencyConfig, store: Store) -> Result<Self, AuthError> {
        let verifier = verifier_from_config(&config.auth)?;
        let sessions = session_issuer_from_config(&config.auth.session)?;
        Ok(Self::new(config, store, verifier, sessions))
    }

    pub fn services(&self) -> &Services {
        &self.inner.services
    }

    pub fn verifier(&self) -> &dyn IdentityVerifier {
        self.inner.verifier.as_ref()
    }

    pub fn sessions(&self) -> &SessionIssuer {
        &self.inner.sessions
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.inner.session_config
    }

    pub fn server_config(&self) -> &ServerConfig {
        &self.inner.server
    }

    /// Shared secret for `/api/debug/*`; `None` disables those routes.
    pub fn debug_secret(&self) -> Option<&str> {
        self.inner.debug_secret.as_deref()
    }

    pub fn cache(&self) -> &ListingCache {
        &self.inner.cache
    }
}
