//! Learner-facing routes: the published catalog, lesson progress and
//! mentor applications.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::Uri;
use axum::response::IntoResponse;
use residency_core::RawProgressSubmission;
use residency_runtime::services::MentorApplicationInput;
use serde::Deserialize;
use serde_json::Value;

use super::paths::{ADMIN_MENTOR_APPLICATIONS, ADMIN_USERS};
use super::{listing, revalidate};
use crate::auth::Learner;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery, ListParams};
use crate::response::{created, ok};
use crate::state::AppState;

/// `GET /api/courses`: published courses only.
pub async fn list_courses(
    State(state): State<AppState>,
    _learner: Learner,
    uri: Uri,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<Value>> {
    let search = params.search()?;
    let page = params.page_request();
    let load = state.services().catalog.list_published(search, page);
    listing(&state, &uri, page, None, load).await
}

/// `GET /api/courses/{slug}`: the course with its topics and lessons.
pub async fn course_outline(
    State(state): State<AppState>,
    _learner: Learner,
    Path(slug): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let outline = state.services().catalog.course_outline(&slug).await?;
    Ok(ok(outline))
}

/// `POST /api/progress/lessons`
pub async fn record_progress(
    State(state): State<AppState>,
    learner: Learner,
    ApiJson(submission): ApiJson<RawProgressSubmission>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state
        .services()
        .progress
        .record(&learner.user, &submission)
        .await?;
    if outcome.credits_awarded > 0 {
        revalidate(&state, &[ADMIN_USERS]).await;
    }
    Ok(ok(outcome))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressQuery {
    pub course_id: Option<String>,
}

/// `GET /api/progress/lessons?courseId=`
pub async fn list_progress(
    State(state): State<AppState>,
    learner: Learner,
    ApiQuery(query): ApiQuery<ProgressQuery>,
) -> ApiResult<impl IntoResponse> {
    let course_id = ListParams::id("courseId", query.course_id.as_deref())?;
    let records = state
        .services()
        .progress
        .list_for_user(&learner.user, course_id)
        .await?;
    Ok(ok(records))
}

/// `POST /api/mentor-applications`
pub async fn submit_application(
    State(state): State<AppState>,
    learner: Learner,
    ApiJson(input): ApiJson<MentorApplicationInput>,
) -> ApiResult<impl IntoResponse> {
    let application = state
        .services()
        .mentors
        .submit(&learner.user, input)
        .await?;
    revalidate(&state, &[ADMIN_MENTOR_APPLICATIONS]).await;
    Ok(created(application))
}
