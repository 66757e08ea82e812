//! Admin CRUD for courses, topics and lessons.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::Uri;
use axum::response::IntoResponse;
use residency_runtime::services::{CourseInput, LessonInput, TopicInput};
use residency_runtime::{CourseFilter, LessonFilter, TopicFilter};
use serde_json::Value;

use super::paths::{ADMIN_COURSES, ADMIN_LESSONS, ADMIN_TOPICS, COURSES};
use super::{Deleted, listing, revalidate};
use crate::auth::AdminPrincipal;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery, ListParams, path_id};
use crate::mock;
use crate::response::{created, ok};
use crate::state::AppState;

// ------------------------------------------------------------------ courses

pub async fn list_courses(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    uri: Uri,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<Value>> {
    let filter = CourseFilter {
        search: params.search()?,
        status: ListParams::parse(params.status.as_deref())?,
    };
    let page = params.page_request();
    let load = state.services().catalog.list_courses(&filter, page);
    listing(&state, &uri, page, Some(mock::courses), load).await
}

pub async fn get_course(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let course = state.services().catalog.get_course(path_id(&id)?).await?;
    Ok(ok(course))
}

pub async fn create_course(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    ApiJson(input): ApiJson<CourseInput>,
) -> ApiResult<impl IntoResponse> {
    let course = state.services().catalog.create_course(input).await?;
    revalidate(&state, &[ADMIN_COURSES, COURSES]).await;
    Ok(created(course))
}

pub async fn update_course(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<CourseInput>,
) -> ApiResult<impl IntoResponse> {
    let course = state
        .services()
        .catalog
        .update_course(path_id(&id)?, input)
        .await?;
    revalidate(&state, &[ADMIN_COURSES, COURSES]).await;
    Ok(ok(course))
}

pub async fn delete_course(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = path_id(&id)?;
    state.services().catalog.delete_course(id).await?;
    revalidate(&state, &[ADMIN_COURSES, COURSES]).await;
    Ok(ok(Deleted { id }))
}

// ------------------------------------------------------------------- topics

pub async fn list_topics(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    uri: Uri,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<Value>> {
    let filter = TopicFilter {
        search: params.search()?,
        course_id: ListParams::id("courseId", params.course_id.as_deref())?,
    };
    let page = params.page_request();
    let load = state.services().catalog.list_topics(&filter, page);
    listing(&state, &uri, page, None, load).await
}

pub async fn get_topic(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let topic = state.services().catalog.get_topic(path_id(&id)?).await?;
    Ok(ok(topic))
}

pub async fn create_topic(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    ApiJson(input): ApiJson<TopicInput>,
) -> ApiResult<impl IntoResponse> {
    let topic = state.services().catalog.create_topic(input).await?;
    revalidate(&state, &[ADMIN_TOPICS]).await;
    Ok(created(topic))
}

pub async fn update_topic(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<TopicInput>,
) -> ApiResult<impl IntoResponse> {
    let topic = state
        .services()
        .catalog
        .update_topic(path_id(&id)?, input)
        .await?;
    revalidate(&state, &[ADMIN_TOPICS]).await;
    Ok(ok(topic))
}

pub async fn delete_topic(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = path_id(&id)?;
    state.services().catalog.delete_topic(id).await?;
    revalidate(&state, &[ADMIN_TOPICS]).await;
    Ok(ok(Deleted { id }))
}

// ------------------------------------------------------------------ lessons

pub async fn list_lessons(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    uri: Uri,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<Value>> {
    let filter = LessonFilter {
        search: params.search()?,
        course_id: ListParams::id("courseId", params.course_id.as_deref())?,
        topic_id: ListParams::id("topicId", params.topic_id.as_deref())?,
    };
    let page = params.page_request();
    let load = state.services().catalog.list_lessons(&filter, page);
    listing(&state, &uri, page, None, load).await
}

pub async fn get_lesson(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let lesson = state.services().catalog.get_lesson(path_id(&id)?).await?;
    Ok(ok(lesson))
}

pub async fn create_lesson(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    ApiJson(input): ApiJson<LessonInput>,
) -> ApiResult<impl IntoResponse> {
    let lesson = state.services().catalog.create_lesson(input).await?;
    revalidate(&state, &[ADMIN_LESSONS]).await;
    Ok(created(lesson))
}

pub async fn update_lesson(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<LessonInput>,
) -> ApiResult<impl IntoResponse> {
    let lesson = state
        .services()
        .catalog
        .update_lesson(path_id(&id)?, input)
        .await?;
    revalidate(&state, &[ADMIN_LESSONS]).await;
    Ok(ok(lesson))
}

pub async fn delete_lesson(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = path_id(&id)?;
    state.services().catalog.delete_lesson(id).await?;
    revalidate(&state, &[ADMIN_LESSONS]).await;
    Ok(ok(Deleted { id }))
}
