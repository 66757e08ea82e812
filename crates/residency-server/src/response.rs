//! Success envelopes: `{ success, data }`, plus `pagination` on lists.

use axum::Json;
use axum::http::StatusCode;
use residency_core::{Page, Paginated};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Page>,
}

pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data: Some(data),
        pagination: None,
    })
}

/// `{ "success": true }` with no data.
pub fn done() -> Json<Envelope<()>> {
    Json(Envelope {
        success: true,
        data: None,
        pagination: None,
    })
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::CREATED, ok(data))
}

pub fn list<T: Serialize>(result: Paginated<T>) -> Envelope<Vec<T>> {
    Envelope {
        success: true,
        data: Some(result.items),
        pagination: Some(result.page),
    }
}

/// A list envelope as JSON, ready for the listing cache.
pub fn list_value<T: Serialize>(result: Paginated<T>) -> ApiResult<Value> {
    serde_json::to_value(list(result)).map_err(|e| ApiError::Internal(e.to_string()))
}
