//! HTTP request handlers.

pub mod catalog;
pub mod dashboard;
pub mod debug;
pub mod learner;
pub mod mentors;
pub mod session;
pub mod users;

use std::future::Future;

use axum::Json;
use axum::http::Uri;
use residency_core::{PageRequest, Paginated};
use residency_runtime::ServiceResult;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::warn;
use uuid::Uuid;

use crate::cache::cache_key;
use crate::error::{ApiError, ApiResult};
use crate::response::list_value;
use crate::state::AppState;

/// Listing paths, as passed to [`revalidate`].
pub mod paths {
    pub const ADMIN_COURSES: &str = "/api/admin/courses";
    pub const ADMIN_TOPICS: &str = "/api/admin/topics";
    pub const ADMIN_LESSONS: &str = "/api/admin/lessons";
    pub const ADMIN_USERS: &str = "/api/admin/users";
    pub const ADMIN_MENTOR_APPLICATIONS: &str = "/api/admin/mentor-applications";
    pub const COURSES: &str = "/api/courses";
}

/// Sample rows for a listing whose store is down.
pub(crate) type Fallback<T> = fn(PageRequest) -> Paginated<T>;

/// Body of a successful delete.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: Uuid,
}

/// Serve a listing through the cache.
///
/// A store outage is answered from `fallback` when one is given and
/// `server.fallback_to_mock_data` is on; sample pages are never cached.
pub(crate) async fn listing<T, F>(
    state: &AppState,
    uri: &Uri,
    page: PageRequest,
    fallback: Option<Fallback<T>>,
    load: F,
) -> ApiResult<Json<Value>>
where
    T: Serialize,
    F: Future<Output = ServiceResult<Paginated<T>>>,
{
    let key = cache_key(uri);
    if let Some(hit) = state.cache().get(&key).await {
        return Ok(Json(hit));
    }

    match load.await {
        Ok(result) => {
            let body = list_value(result)?;
            state.cache().put(key, body.clone()).await;
            Ok(Json(body))
        }
        Err(err) if err.is_unavailable() && state.server_config().fallback_to_mock_data => {
            let Some(sample) = fallback else {
                return Err(err.into());
            };
            warn!(path = %uri.path(), error = %err, "store unavailable; serving sample data");
            Ok(Json(list_value(sample(page))?))
        }
        Err(err) => Err(err.into()),
    }
}

/// Drop cached listings under each path.
pub(crate) async fn revalidate(state: &AppState, paths: &[&str]) {
    for path in paths {
        state.cache().revalidate(path).await;
    }
}

pub async fn healthz() -> Json<Value> {
    Json(json!({ "ok": true, "service": "residency-server" }))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("route not found".into())
}
