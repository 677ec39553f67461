//! OFX × CNAB reconciliation queue and reconciliation rules.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use contta_core::reconciliation::{
    InvoiceMatch, ReconciliationError, ReconciliationReport, RuleType, match_invoice,
    match_ofx_cnab,
};
use contta_core::statements::{parse_cnab, parse_ofx};
use contta_db::entities::{pending_reconciliations, reconciliation_rules};
use contta_db::repositories::{CreateRuleInput, NewPending};
use contta_db::{InvoiceRepository, ReconciliationRepository};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::TenantRecord;
use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{Access, AuthUser};

/// Creates the reconciliation routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tenants/{tenant_id}/reconciliations/ofx-cnab", post(reconcile_ofx_cnab))
        .route("/tenants/{tenant_id}/reconciliations/pending", get(list_pending))
        .route("/tenants/{tenant_id}/reconciliations/{id}/approve", post(approve))
        .route("/tenants/{tenant_id}/reconciliations/{id}/reject", post(reject))
        .route(
            "/tenants/{tenant_id}/reconciliation-rules",
            get(list_rules).post(create_rule),
        )
}

/// Request body for matching a statement against a return file.
#[derive(Debug, Deserialize)]
pub struct OfxCnabRequest {
    /// OFX statement.
    pub ofx_content: String,
    /// CNAB 240 or 400 return file.
    pub cnab_content: String,
    /// Account both files belong to.
    pub bank_account_id: Option<Uuid>,
}

/// Matching result plus what was queued.
#[derive(Debug, Serialize)]
pub struct OfxCnabResponse {
    /// Pairs and counters.
    #[serde(flatten)]
    pub report: ReconciliationReport,
    /// Pairs that also found the invoice they pay.
    pub invoices_matched: usize,
    /// Queued rows.
    pub pending: Vec<pending_reconciliations::Model>,
    /// Pairs already queued by an earlier upload.
    pub duplicates: usize,
}

/// POST `/tenants/{tenant_id}/reconciliations/ofx-cnab` - Matches OFX credits
/// with settled boletos and queues the pairs for approval.
async fn reconcile_ofx_cnab(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
    Json(payload): Json<OfxCnabRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.authorize(tenant_id, Access::Write)?;
    let ofx = parse_ofx(&payload.ofx_content).map_err(ReconciliationError::InvalidOfx)?;
    let cnab = parse_cnab(&payload.cnab_content).map_err(ReconciliationError::InvalidCnab)?;
    let report = match_ofx_cnab(&ofx.transactions, &cnab.records);

    let candidates = InvoiceRepository::new((*state.db).clone())
        .candidates(tenant_id)
        .await?;
    let invoice_matches: Vec<Option<InvoiceMatch>> = report
        .matches
        .iter()
        .map(|pair| {
            cnab.records
                .get(pair.cnab_index)
                .and_then(|record| match_invoice(record, &candidates))
        })
        .collect();
    let pairs: Vec<NewPending<'_>> = report
        .matches
        .iter()
        .zip(&invoice_matches)
        .map(|(pair, invoice)| NewPending {
            pair,
            ofx_description: ofx
                .transactions
                .get(pair.ofx_index)
                .map(|t| t.description.as_str()),
            invoice: invoice.as_ref(),
        })
        .collect();

    let queued = ReconciliationRepository::new((*state.db).clone())
        .store_pending(tenant_id, payload.bank_account_id, &pairs)
        .await?;
    let invoices_matched = invoice_matches.iter().flatten().count();
    info!(
        tenant_id = %tenant_id,
        matched = report.matched_transactions,
        invoices = invoices_matched,
        queued = queued.stored.len(),
        "OFX and CNAB reconciled"
    );

    Ok((
        StatusCode::OK,
        Json(OfxCnabResponse {
            report,
            invoices_matched,
            pending: queued.stored,
            duplicates: queued.duplicates,
        }),
    ))
}

/// GET `/tenants/{tenant_id}/reconciliations/pending` - Pairs waiting for approval.
async fn list_pending(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
) -> ApiResult<Json<Vec<pending_reconciliations::Model>>> {
    auth.authorize(tenant_id, Access::Read)?;
    let rows = ReconciliationRepository::new((*state.db).clone())
        .list_pending(tenant_id)
        .await?;
    Ok(Json(rows))
}

/// POST `/tenants/{tenant_id}/reconciliations/{id}/approve` - Receives the
/// matched invoice and marks the pair approved.
async fn approve(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((tenant_id, id)): Path<TenantRecord>,
) -> ApiResult<Json<pending_reconciliations::Model>> {
    auth.authorize(tenant_id, Access::Write)?;
    let row = ReconciliationRepository::new((*state.db).clone())
        .approve(tenant_id, id, &state.config.chart, auth.user_id())
        .await?;
    Ok(Json(row))
}

/// POST `/tenants/{tenant_id}/reconciliations/{id}/reject` - Discards a pair.
async fn reject(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((tenant_id, id)): Path<TenantRecord>,
) -> ApiResult<Json<pending_reconciliations::Model>> {
    auth.authorize(tenant_id, Access::Write)?;
    let row = ReconciliationRepository::new((*state.db).clone())
        .reject(tenant_id, id, auth.user_id())
        .await?;
    Ok(Json(row))
}

/// GET `/tenants/{tenant_id}/reconciliation-rules` - Rules by priority.
async fn list_rules(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
) -> ApiResult<Json<Vec<reconciliation_rules::Model>>> {
    auth.authorize(tenant_id, Access::Read)?;
    let rows = ReconciliationRepository::new((*state.db).clone())
        .list_rules(tenant_id)
        .await?;
    Ok(Json(rows))
}

/// Request body for creating a rule.
#[derive(Debug, Deserialize)]
pub struct CreateRuleRequest {
    /// Display name.
    pub name: String,
    /// Case-insensitive regular expression over the bank history.
    pub pattern: String,
    /// `expense` or `revenue`.
    pub rule_type: String,
    /// Expense category to look for.
    pub target_category: Option<String>,
    /// Acts during import (default: true).
    pub auto_match: Option<bool>,
    /// Higher runs first (default: 0).
    pub priority: Option<i32>,
}

/// POST `/tenants/{tenant_id}/reconciliation-rules` - Creates a rule.
async fn create_rule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
    Json(payload): Json<CreateRuleRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.authorize(tenant_id, Access::Write)?;
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("invalid_name", "Rule name is required"));
    }
    let rule_type: RuleType = payload.rule_type.parse()?;
    if rule_type == RuleType::Expense && payload.target_category.is_none() {
        return Err(ApiError::bad_request(
            "missing_category",
            "Expense rules need a target_category",
        ));
    }

    let input = CreateRuleInput {
        name: name.to_string(),
        pattern: payload.pattern,
        rule_type,
        target_category: payload.target_category,
        auto_match: payload.auto_match.unwrap_or(true),
        priority: payload.priority.unwrap_or(0),
    };
    let rule = ReconciliationRepository::new((*state.db).clone())
        .create_rule(tenant_id, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(rule)))
}
