//! Firebase ID token verification against Google's published keys.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use reqwest::Client;
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::identity::{IdentityVerifier, RoleClaims, VerifiedIdentity};

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    admin: Option<bool>,
    #[serde(default, rename = "superAdmin")]
    super_admin: Option<bool>,
}

/// Minimum gap between two key fetches, whatever `max-age` says.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
const MAX_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Default)]
struct KeyCache {
    keys: HashMap<String, DecodingKey>,
    /// Earliest time an unknown `kid` may trigger another fetch.
    next_refresh: Option<Instant>,
}

impl KeyCache {
    fn may_refresh(&self, now: Instant) -> bool {
        self.next_refresh.is_none_or(|at| now >= at)
    }
}

pub struct FirebaseVerifier {
    project_id: String,
    jwks_url: String,
    client: Client,
    cache: RwLock<KeyCache>,
}

impl FirebaseVerifier {
    pub fn new(project_id: impl Into<String>, jwks_url: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            jwks_url: jwks_url.into(),
            client: Client::new(),
            cache: RwLock::new(KeyCache::default()),
        }
    }

    /// Build with a fixed key set, skipping the network fetch.
    pub fn with_keys(project_id: impl Into<String>, keys: HashMap<String, DecodingKey>) -> Self {
        Self {
            project_id: project_id.into(),
            jwks_url: String::new(),
            client: Client::new(),
            cache: RwLock::new(KeyCache {
                keys,
                next_refresh: None,
            }),
        }
    }

    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[self.issuer()]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "aud", "iss"]);
        validation
    }

    async fn key_for(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        let unknown = || AuthError::InvalidToken(format!("unknown key id '{kid}'"));

        {
            let cache = self.cache.read().await;
            if let Some(key) = cache.keys.get(kid) {
                return Ok(key.clone());
            }
            if self.jwks_url.is_empty() || !cache.may_refresh(Instant::now()) {
                return Err(unknown());
            }
        }

        // Google rotates keys; an unknown kid may mean the cache is stale.
        let mut cache = self.cache.write().await;
        if let Some(key) = cache.keys.get(kid) {
            return Ok(key.clone());
        }
        if !cache.may_refresh(Instant::now()) {
            return Err(unknown());
        }

        match self.fetch_keys().await {
            Ok((keys, max_age)) => {
                let interval = max_age.map_or(MIN_REFRESH_INTERVAL, |age| {
                    age.clamp(MIN_REFRESH_INTERVAL, MAX_REFRESH_INTERVAL)
                });
                cache.keys = keys;
                cache.next_refresh = Some(Instant::now() + interval);
                cache.keys.get(kid).cloned().ok_or_else(unknown)
            }
            Err(e) => {
                cache.next_refresh = Some(Instant::now() + MIN_REFRESH_INTERVAL);
                Err(e)
            }
        }
    }

    async fn fetch_keys(
        &self,
    ) -> Result<(HashMap<String, DecodingKey>, Option<Duration>), AuthError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AuthError::KeyFetch(format!(
                "key endpoint returned status {}",
                response.status()
            )));
        }
        let max_age = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(max_age);
        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;

        let mut keys = HashMap::new();
        for jwk in &set.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(e) => warn!(kid = %kid, error = %e, "skipping unusable signing key"),
            }
        }
        debug!(count = keys.len(), ?max_age, "refreshed identity provider keys");
        Ok((keys, max_age))
    }
}

/// `max-age` from a `Cache-Control` value.
fn max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().split_once('='))
        .find(|(name, _)| name.eq_ignore_ascii_case("max-age"))
        .and_then(|(_, secs)| secs.trim().parse().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token has no key id".into()))?;
        let key = self.key_for(&kid).await?;

        let data = decode::<FirebaseClaims>(token, &key, &self.validation()).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        let claims = data.claims;
        if claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken("empty subject".into()));
        }

        Ok(VerifiedIdentity {
            uid: claims.sub,
            email: claims.email,
            name: claims.name,
            claims: RoleClaims {
                admin: claims.admin.unwrap_or(false),
                super_admin: claims.super_admin.unwrap_or(false),
            },
        })
    }
}
