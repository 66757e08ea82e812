//! Operator-only diagnostics behind `x-debug-secret`.
//!
//! The routes answer 404 unless `DEBUG_SEED_SECRET` is configured.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use residency_runtime::services::AdminDashboard;
use serde::Serialize;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::response::ok;
use crate::state::AppState;

pub const DEBUG_SECRET_HEADER: &str = "x-debug-secret";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugStats {
    #[serde(flatten)]
    pub counts: AdminDashboard,
    pub cached_listings: usize,
}

fn check_secret(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let Some(secret) = state.debug_secret() else {
        return Err(ApiError::NotFound("route not found".into()));
    };
    let provided = headers
        .get(DEBUG_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    if provided != Some(secret) {
        warn!("debug route called without a valid secret");
        return Err(ApiError::Unauthorized("invalid debug secret".into()));
    }
    Ok(())
}

/// `GET /api/debug/stats`
pub async fn stats(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<impl IntoResponse> {
    check_secret(&state, &headers)?;
    let counts = state.services().dashboard.admin_summary().await?;
    Ok(ok(DebugStats {
        counts,
        cached_listings: state.cache().len().await,
    }))
}
