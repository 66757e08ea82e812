//! Request extractors that reject with the JSON error envelope.

use std::str::FromStr;

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use residency_core::{CoreError, PageRequest, parse_id};
use residency_runtime::SearchText;
use residency_runtime::services;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// `axum::Json`, but a bad body is a 400 with the usual envelope.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// `axum::extract::Query` with the same rejection treatment.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// Query parameters accepted by listing endpoints. Each endpoint reads the
/// filters it supports and ignores the rest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub role: Option<String>,
    pub course_id: Option<String>,
    pub topic_id: Option<String>,
}

impl ListParams {
    /// Unparseable numbers fall back to the defaults.
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(number(self.page.as_deref()), number(self.limit.as_deref()))
    }

    pub fn search(&self) -> ApiResult<Option<SearchText>> {
        Ok(services::search(self.search.as_deref())?)
    }

    /// An enum filter such as `status` or `role`; blank means unfiltered.
    pub fn parse<T>(value: Option<&str>) -> ApiResult<Option<T>>
    where
        T: FromStr<Err = CoreError>,
    {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => Ok(Some(v.parse()?)),
            None => Ok(None),
        }
    }

    /// An id filter such as `courseId`; blank means unfiltered.
    pub fn id(field: &str, value: Option<&str>) -> ApiResult<Option<Uuid>> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => Ok(Some(parse_id(field, v)?)),
            None => Ok(None),
        }
    }
}

fn number(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|v| v.trim().parse().ok())
}

/// Parse an id taken from the URL path.
pub fn path_id(raw: &str) -> ApiResult<Uuid> {
    Ok(parse_id("id", raw)?)
}
