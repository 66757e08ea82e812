//! Aggregate views for admins and learners.

use axum::extract::State;
use axum::response::IntoResponse;

use crate::auth::{AdminPrincipal, Learner};
use crate::error::ApiResult;
use crate::response::ok;
use crate::state::AppState;

/// `GET /api/admin/dashboard`
pub async fn admin_dashboard(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
) -> ApiResult<impl IntoResponse> {
    let summary = state.services().dashboard.admin_summary().await?;
    Ok(ok(summary))
}

/// `GET /api/dashboard`
pub async fn learner_dashboard(
    State(state): State<AppState>,
    learner: Learner,
) -> ApiResult<impl IntoResponse> {
    let summary = state
        .services()
        .dashboard
        .learner_summary(&learner.user)
        .await?;
    Ok(ok(summary))
}
