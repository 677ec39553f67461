//! Invoice and monthly fee routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use contta_core::billing::InvoiceStatus;
use contta_db::entities::invoices;
use contta_db::repositories::{CreateInvoiceInput, InvoiceFilter};
use contta_db::{ClientRepository, InvoiceRepository};
use contta_shared::types::{FiscalMonth, PageRequest, PageResponse, today_brazil};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{TenantRecord, parse_period};
use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{Access, AuthUser};

/// Creates the invoice routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/tenants/{tenant_id}/invoices",
            get(list_invoices).post(create_invoice),
        )
        .route("/tenants/{tenant_id}/invoices/generate-monthly", post(generate_monthly))
        .route("/tenants/{tenant_id}/invoices/{id}", get(get_invoice))
        .route("/tenants/{tenant_id}/invoices/{id}/cancel", post(cancel_invoice))
}

/// Query parameters for listing invoices.
#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
    /// pending, paid or cancelled.
    pub status: Option<String>,
    /// Client.
    pub client_id: Option<Uuid>,
    /// `YYYY-MM`.
    pub competence: Option<String>,
    /// Page number (1-indexed, default: 1).
    pub page: Option<u32>,
    /// Items per page (default: 50).
    pub per_page: Option<u32>,
}

/// Request body for issuing an invoice.
#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    /// Billed client.
    pub client_id: Uuid,
    /// `YYYY-MM` the service refers to.
    pub competence: String,
    /// Description.
    pub description: String,
    /// Amount.
    pub amount: Decimal,
    /// Due date.
    pub due_date: NaiveDate,
    /// Number printed on the boleto.
    pub document_number: Option<String>,
}

/// GET `/tenants/{tenant_id}/invoices` - Lists invoices by due date.
async fn list_invoices(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
    Query(query): Query<ListInvoicesQuery>,
) -> ApiResult<Json<PageResponse<invoices::Model>>> {
    auth.authorize(tenant_id, Access::Read)?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<InvoiceStatus>)
        .transpose()
        .map_err(|e| ApiError::bad_request("invalid_status", e))?;
    let competence = query.competence.as_deref().map(parse_period).transpose()?;
    let filter = InvoiceFilter {
        status,
        client_id: query.client_id,
        competence,
    };
    let page = PageRequest::new(query.page, query.per_page);
    let (rows, total) = InvoiceRepository::new((*state.db).clone())
        .list(tenant_id, &filter, &page)
        .await?;
    Ok(Json(PageResponse::new(rows, &page, total)))
}

/// POST `/tenants/{tenant_id}/invoices` - Issues an invoice and posts its provision.
async fn create_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
    Json(payload): Json<CreateInvoiceRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.authorize(tenant_id, Access::Write)?;
    let competence = parse_period(&payload.competence)?;
    if payload.amount <= Decimal::ZERO {
        return Err(ApiError::bad_request(
            "invalid_amount",
            "Amount must be greater than zero",
        ));
    }
    let input = CreateInvoiceInput {
        client_id: payload.client_id,
        competence,
        description: payload.description,
        amount: payload.amount,
        due_date: payload.due_date,
        document_number: payload.document_number,
        reference: None,
    };
    let invoice = InvoiceRepository::new((*state.db).clone())
        .create(tenant_id, &input, &state.config.chart, auth.user_id())
        .await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// GET `/tenants/{tenant_id}/invoices/{id}` - One invoice.
async fn get_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((tenant_id, id)): Path<TenantRecord>,
) -> ApiResult<Json<invoices::Model>> {
    auth.authorize(tenant_id, Access::Read)?;
    let invoice = InvoiceRepository::new((*state.db).clone())
        .find(tenant_id, id)
        .await?;
    Ok(Json(invoice))
}

/// POST `/tenants/{tenant_id}/invoices/{id}/cancel` - Cancels a pending
/// invoice and reverses its provision.
async fn cancel_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((tenant_id, id)): Path<TenantRecord>,
) -> ApiResult<Json<invoices::Model>> {
    auth.authorize(tenant_id, Access::Write)?;
    let today = today_brazil();
    let invoice = InvoiceRepository::new((*state.db).clone())
        .cancel(tenant_id, id, today, &state.config.chart, auth.user_id())
        .await?;
    Ok(Json(invoice))
}

/// Request body for fee generation.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateMonthlyRequest {
    /// `YYYY-MM`; defaults to the current month in Brazil.
    pub competence: Option<String>,
}

/// Fee generation summary.
#[derive(Debug, Serialize)]
pub struct GenerateMonthlyResponse {
    /// Competence billed.
    pub competence: FiscalMonth,
    /// Invoices created now.
    pub created: Vec<invoices::Model>,
    /// Clients already billed for the competence.
    pub already_generated: usize,
    /// Inactive clients or clients without a fee.
    pub ineligible: usize,
    /// Sum of the created invoices.
    pub total: Decimal,
}

/// POST `/tenants/{tenant_id}/invoices/generate-monthly` - Bills the monthly
/// fee of every active client once per competence.
async fn generate_monthly(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
    payload: Option<Json<GenerateMonthlyRequest>>,
) -> ApiResult<impl IntoResponse> {
    auth.authorize(tenant_id, Access::Write)?;
    let Json(payload) = payload.unwrap_or_default();
    let competence = match payload.competence.as_deref() {
        Some(value) => parse_period(value)?,
        None => FiscalMonth::current_brazil(),
    };

    let fee_clients = ClientRepository::new((*state.db).clone())
        .fee_clients(tenant_id)
        .await?;
    let generation = InvoiceRepository::new((*state.db).clone())
        .generate_monthly_fees(
            tenant_id,
            competence,
            &fee_clients,
            &state.config.chart,
            auth.user_id(),
        )
        .await?;
    let status = if generation.created.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(GenerateMonthlyResponse {
            competence: generation.competence,
            created: generation.created,
            already_generated: generation.already_generated,
            ineligible: generation.ineligible,
            total: generation.total,
        }),
    ))
}
