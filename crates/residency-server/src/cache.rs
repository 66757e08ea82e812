//! In-process cache for listing responses.
//!
//! Entries are keyed by request path plus query string. Mutations call
//! [`ListingCache::revalidate`] with the listing path they affect, which
//! drops every cached variant (any page, filter or search) under it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::http::Uri;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

struct Entry {
    stored_at: Instant,
    body: Value,
}

pub struct ListingCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl ListingCache {
    /// A zero TTL disables caching.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        if !self.is_enabled() {
            return None;
        }
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.body.clone())
    }

    pub async fn put(&self, key: String, body: Value) {
        if !self.is_enabled() {
            return;
        }
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.stored_at.elapsed() < self.ttl);
        entries.insert(
            key,
            Entry {
                stored_at: Instant::now(),
                body,
            },
        );
    }

    /// Drop every entry whose path starts with `path`.
    pub async fn revalidate(&self, path: &str) {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(path));
        debug!(path, dropped = before - entries.len(), "listing cache revalidated");
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Cache key for a request: path and query, exactly as sent.
pub fn cache_key(uri: &Uri) -> String {
    match uri.query() {
        Some(query) => format!("{}?{query}", uri.path()),
        None => uri.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn revalidate_drops_every_variant_under_path() {
        let cache = ListingCache::new(Duration::from_secs(60));
        cache.put("/api/admin/courses?page=1".into(), json!(1)).await;
        cache.put("/api/admin/courses?page=2&search=x".into(), json!(2)).await;
        cache.put("/api/admin/topics".into(), json!(3)).await;

        cache.revalidate("/api/admin/courses").await;

        assert!(cache.get("/api/admin/courses?page=1").await.is_none());
        assert!(cache.get("/api/admin/courses?page=2&search=x").await.is_none());
        assert_eq!(cache.get("/api/admin/topics").await, Some(json!(3)));
    }

    #[tokio::test]
    async fn zero_ttl_never_stores() {
        let cache = ListingCache::new(Duration::ZERO);
        cache.put("/api/admin/users".into(), json!([])).await;
        assert!(cache.get("/api/admin/users").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[test]
    fn key_keeps_query() {
        let uri: Uri = "/api/admin/users?role=admin&page=2".parse().unwrap();
        assert_eq!(cache_key(&uri), "/api/admin/users?role=admin&page=2");
        let uri: Uri = "/api/courses".parse().unwrap();
        assert_eq!(cache_key(&uri), "/api/courses");
    }
}
