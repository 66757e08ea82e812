//! Admin session exchange: a verified ID token in, an `HttpOnly` cookie out.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use residency_core::Role;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{cleared_session_cookie, session_cookie};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::response::{done, ok};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub id_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// `POST /api/admin/auth/session`
pub async fn create_session(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SessionRequest>,
) -> ApiResult<Response> {
    let token = body
        .id_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("idToken is required".into()))?;

    let identity = state.verifier().verify_id_token(token).await?;
    if !identity.claims.is_admin() {
        warn!(uid = %identity.uid, "session refused: no admin claim");
        return Err(ApiError::Forbidden("admin access required".into()));
    }

    let session = state.sessions().mint(&identity)?;
    info!(uid = %identity.uid, expires_at = %session.expires_at, "admin session created");

    let cookie = session_cookie(state.session_config(), &session.token);
    let info = SessionInfo {
        role: identity.claimed_role(),
        uid: identity.uid,
        email: identity.email,
        expires_at: session.expires_at,
    };
    Ok(([(SET_COOKIE, cookie)], ok(info)).into_response())
}

/// `DELETE /api/admin/auth/session`
pub async fn delete_session(State(state): State<AppState>) -> Response {
    let cookie = cleared_session_cookie(state.session_config());
    ([(SET_COOKIE, cookie)], done()).into_response()
}
