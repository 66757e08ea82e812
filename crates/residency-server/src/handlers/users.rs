//! Admin user management and credit adjustments.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::Uri;
use axum::response::IntoResponse;
use residency_core::CreditTransaction;
use residency_runtime::UserFilter;
use residency_runtime::services::{CreditAdjustment, UserInput};
use serde::Serialize;
use serde_json::Value;

use super::paths::ADMIN_USERS;
use super::{Deleted, listing, revalidate};
use crate::auth::AdminPrincipal;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery, ListParams, path_id};
use crate::mock;
use crate::response::{Envelope, created, ok};
use crate::state::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    uri: Uri,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<Value>> {
    let filter = UserFilter {
        search: params.search()?,
        role: ListParams::parse(params.role.as_deref())?,
    };
    let page = params.page_request();
    let load = state.services().users.list(&filter, page);
    listing(&state, &uri, page, Some(mock::users), load).await
}

pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let user = state.services().users.get(path_id(&id)?).await?;
    Ok(ok(user))
}

pub async fn create_user(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    ApiJson(input): ApiJson<UserInput>,
) -> ApiResult<impl IntoResponse> {
    let user = state.services().users.create(input).await?;
    revalidate(&state, &[ADMIN_USERS]).await;
    Ok(created(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UserInput>,
) -> ApiResult<impl IntoResponse> {
    let user = state.services().users.update(path_id(&id)?, input).await?;
    revalidate(&state, &[ADMIN_USERS]).await;
    Ok(ok(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = path_id(&id)?;
    state.services().users.delete(id).await?;
    revalidate(&state, &[ADMIN_USERS]).await;
    Ok(ok(Deleted { id }))
}

/// A user's ledger page with both balances.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditHistory {
    /// Cached balance on the user record.
    pub balance: i64,
    /// Sum of every ledger entry. Below `balance` when a debit was clamped
    /// at zero.
    pub ledger_balance: i64,
    pub transactions: Vec<CreditTransaction>,
}

/// `GET /api/admin/users/{id}/credits`
pub async fn list_credits(
    State(state): State<AppState>,
    _admin: AdminPrincipal,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<Envelope<CreditHistory>>> {
    let services = state.services();
    let user = services.users.get(path_id(&id)?).await?;
    let page = services
        .credits
        .list_transactions(user.id, params.page_request())
        .await?;
    let ledger_balance = services.credits.ledger_balance(user.id).await?;

    Ok(Json(Envelope {
        success: true,
        data: Some(CreditHistory {
            balance: user.credits,
            ledger_balance,
            transactions: page.items,
        }),
        pagination: Some(page.page),
    }))
}

/// `POST /api/admin/users/{id}/credits`
pub async fn update_credits(
    State(state): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    Path(id): Path<String>,
    ApiJson(adjustment): ApiJson<CreditAdjustment>,
) -> ApiResult<impl IntoResponse> {
    let update = state
        .services()
        .credits
        .update_user_credits(path_id(&id)?, adjustment, admin.user_id())
        .await?;
    revalidate(&state, &[ADMIN_USERS]).await;
    Ok(ok(update))
}
