//! Admin review of mentor applications.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::Uri;
use axum::response::IntoResponse;
use residency_runtime::MentorApplicationFilter;
use residency_runtime::services::MentorReview;
use serde_json::Value;

use super::paths::{ADMIN_MENTOR_APPLICATIONS, ADMIN_USERS};
use super::{Deleted, listing, revalidate};
use crate::auth::AdminPrincipal;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery, ListParams, path_id};
use crate::mock;
use crate::response::ok;
use crate::state::AppState;

pub async fn list_applications(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    uri: Uri,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<Value>> {
    let filter = MentorApplicationFilter {
        search: params.search()?,
        status: ListParams::parse(params.status.as_deref())?,
    };
    let page = params.page_request();
    let load = state.services().mentors.list(&filter, page);
    listing(&state, &uri, page, Some(mock::mentor_applications), load).await
}

pub async fn get_application(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let application = state.services().mentors.get(path_id(&id)?).await?;
    Ok(ok(application))
}

/// `PATCH /api/admin/mentor-applications/{id}` with `{ status, note }`.
pub async fn review_application(
    State(state): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    Path(id): Path<String>,
    ApiJson(review): ApiJson<MentorReview>,
) -> ApiResult<impl IntoResponse> {
    let application = state
        .services()
        .mentors
        .review(path_id(&id)?, admin.user_id(), review)
        .await?;
    // Approval can promote the applicant.
    revalidate(&state, &[ADMIN_MENTOR_APPLICATIONS, ADMIN_USERS]).await;
    Ok(ok(application))
}

pub async fn delete_application(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = path_id(&id)?;
    state.services().mentors.delete(id).await?;
    revalidate(&state, &[ADMIN_MENTOR_APPLICATIONS]).await;
    Ok(ok(Deleted { id }))
}
