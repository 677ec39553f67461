//! Chart of accounts routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use contta_db::AccountRepository;
use contta_db::entities::chart_of_accounts;
use contta_db::repositories::{AccountFilter, CreateAccountInput};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{Access, AuthUser};

/// Creates the account routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/tenants/{tenant_id}/accounts",
        get(list_accounts).post(create_account),
    )
}

/// Query parameters for listing accounts.
#[derive(Debug, Deserialize)]
pub struct ListAccountsQuery {
    /// Only accounts that accept postings.
    #[serde(default)]
    pub analytical: bool,
    /// Include deactivated accounts.
    #[serde(default)]
    pub include_inactive: bool,
}

/// Request body for creating an account.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Dotted code; its first digit decides the group.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Whether entries may post to it (default: true).
    pub is_analytical: Option<bool>,
}

/// GET `/tenants/{tenant_id}/accounts` - Lists accounts by code.
async fn list_accounts(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
    Query(query): Query<ListAccountsQuery>,
) -> ApiResult<Json<Vec<chart_of_accounts::Model>>> {
    auth.authorize(tenant_id, Access::Read)?;
    let filter = AccountFilter {
        analytical_only: query.analytical,
        include_inactive: query.include_inactive,
    };
    let accounts = AccountRepository::new((*state.db).clone())
        .list_accounts(tenant_id, &filter)
        .await?;
    Ok(Json(accounts))
}

/// POST `/tenants/{tenant_id}/accounts` - Creates an account.
async fn create_account(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
    Json(payload): Json<CreateAccountRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.authorize(tenant_id, Access::Write)?;
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("invalid_name", "Account name is required"));
    }
    let input = CreateAccountInput {
        code: payload.code.trim().to_string(),
        name: name.to_string(),
        is_analytical: payload.is_analytical.unwrap_or(true),
    };
    let account = AccountRepository::new((*state.db).clone())
        .create_account(tenant_id, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}
