//! Expense routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use contta_core::billing::ExpenseStatus;
use contta_db::ExpenseRepository;
use contta_db::entities::expenses;
use contta_db::repositories::{CreateExpenseInput, ExpenseFilter};
use contta_shared::types::{PageRequest, PageResponse, today_brazil};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::TenantRecord;
use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{Access, AuthUser};

/// Creates the expense routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/tenants/{tenant_id}/expenses",
            get(list_expenses).post(create_expense),
        )
        .route("/tenants/{tenant_id}/expenses/{id}", get(get_expense))
        .route("/tenants/{tenant_id}/expenses/{id}/pay", post(pay_expense))
}

/// Query parameters for listing expenses.
#[derive(Debug, Deserialize)]
pub struct ListExpensesQuery {
    /// pending, paid or cancelled.
    pub status: Option<String>,
    /// Due on or after.
    pub from: Option<NaiveDate>,
    /// Due on or before.
    pub to: Option<NaiveDate>,
    /// Page number (1-indexed, default: 1).
    pub page: Option<u32>,
    /// Items per page (default: 50).
    pub per_page: Option<u32>,
}

/// Request body for registering an expense.
#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    /// Description.
    pub description: String,
    /// Category matched by expense rules.
    pub category: Option<String>,
    /// Expense account.
    pub account_code: String,
    /// Amount.
    pub amount: Decimal,
    /// Due date.
    pub due_date: NaiveDate,
}

/// Request body for paying an expense.
#[derive(Debug, Default, Deserialize)]
pub struct PayExpenseRequest {
    /// Payment date (default: today in Brazil).
    pub paid_at: Option<NaiveDate>,
}

/// GET `/tenants/{tenant_id}/expenses` - Lists expenses by due date.
async fn list_expenses(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
    Query(query): Query<ListExpensesQuery>,
) -> ApiResult<Json<PageResponse<expenses::Model>>> {
    auth.authorize(tenant_id, Access::Read)?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<ExpenseStatus>)
        .transpose()
        .map_err(|e| ApiError::bad_request("invalid_status", e))?;
    let filter = ExpenseFilter {
        status,
        from: query.from,
        to: query.to,
    };
    let page = PageRequest::new(query.page, query.per_page);
    let (rows, total) = ExpenseRepository::new((*state.db).clone())
        .list(tenant_id, &filter, &page)
        .await?;
    Ok(Json(PageResponse::new(rows, &page, total)))
}

/// POST `/tenants/{tenant_id}/expenses` - Registers an expense and posts its provision.
async fn create_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
    Json(payload): Json<CreateExpenseRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.authorize(tenant_id, Access::Write)?;
    if payload.amount <= Decimal::ZERO {
        return Err(ApiError::bad_request(
            "invalid_amount",
            "Amount must be greater than zero",
        ));
    }
    let input = CreateExpenseInput {
        description: payload.description,
        category: payload.category.map(|c| c.trim().to_lowercase()),
        account_code: payload.account_code.trim().to_string(),
        amount: payload.amount,
        due_date: payload.due_date,
    };
    let expense = ExpenseRepository::new((*state.db).clone())
        .create(tenant_id, &input, &state.config.chart, auth.user_id())
        .await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// GET `/tenants/{tenant_id}/expenses/{id}` - One expense.
async fn get_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((tenant_id, id)): Path<TenantRecord>,
) -> ApiResult<Json<expenses::Model>> {
    auth.authorize(tenant_id, Access::Read)?;
    let expense = ExpenseRepository::new((*state.db).clone())
        .find(tenant_id, id)
        .await?;
    Ok(Json(expense))
}

/// POST `/tenants/{tenant_id}/expenses/{id}/pay` - Posts the payment.
async fn pay_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((tenant_id, id)): Path<TenantRecord>,
    payload: Option<Json<PayExpenseRequest>>,
) -> ApiResult<Json<expenses::Model>> {
    auth.authorize(tenant_id, Access::Write)?;
    let Json(payload) = payload.unwrap_or_default();
    let paid_at = payload.paid_at.unwrap_or_else(today_brazil);
    let expense = ExpenseRepository::new((*state.db).clone())
        .pay(tenant_id, id, paid_at, &state.config.chart, auth.user_id())
        .await?;
    Ok(Json(expense))
}
