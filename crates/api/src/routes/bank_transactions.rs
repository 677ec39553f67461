//! Bank statement import, listing, reclassification and collection splits.

use std::collections::HashSet;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use contta_core::classification::{
    AdvisorSuggestion, Classification, ClassificationAdvisor, Classifier, ClientDirectory,
    Confidence, refine_with_advisor,
};
use contta_core::reconciliation::{
    ExpenseCandidate, InvoiceCandidate, ReconciliationRule, RuleTarget, apply_rules,
};
use contta_core::statements::{
    Direction, StatementFormat, StatementLine, idempotency_key, parse_statement,
};
use contta_db::entities::bank_transactions;
use contta_db::repositories::bank_transaction::to_statement_line;
use contta_db::repositories::{BankLineStatus, BankTxFilter, NewBankLine, Posting, SplitRequest};
use contta_db::{
    AccountRepository, BankTransactionRepository, ClientRepository, ExpenseRepository,
    InvoiceRepository, ReconciliationRepository,
};
use contta_shared::types::{PageRequest, PageResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::TenantRecord;
use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{Access, AuthUser};

/// Creates the bank transaction routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tenants/{tenant_id}/bank-transactions", get(list_transactions))
        .route("/tenants/{tenant_id}/bank-transactions/import", post(import_statement))
        .route("/tenants/{tenant_id}/bank-transactions/{id}", get(get_transaction))
        .route("/tenants/{tenant_id}/bank-transactions/{id}/reclassify", post(reclassify))
        .route("/tenants/{tenant_id}/bank-transactions/{id}/split", post(split))
        .route("/tenants/{tenant_id}/bank-transactions/{id}/suggest", post(suggest))
}

fn default_true() -> bool {
    true
}

/// Request body for importing a statement.
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    /// `ofx`, `csv` or `payment_report`.
    pub format: String,
    /// File content.
    pub content: String,
    /// Account the statement belongs to.
    pub bank_account_id: Option<Uuid>,
    /// Uploaded file name.
    pub file_name: Option<String>,
    /// Classify and post each line (default: true).
    #[serde(default = "default_true")]
    pub auto_classify: bool,
}

/// What happened to one line of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    /// Stored (and posted when classified).
    Imported,
    /// Already imported earlier or earlier in the same file.
    Skipped,
    /// Rejected; see `error`.
    Failed,
}

/// Per-line import outcome.
#[derive(Debug, Serialize)]
pub struct LineOutcome {
    /// Line date.
    pub date: NaiveDate,
    /// Bank history.
    pub description: String,
    /// Absolute amount.
    pub amount: Decimal,
    /// Credit or debit.
    pub direction: Direction,
    /// Outcome.
    pub status: LineStatus,
    /// Stored row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_transaction_id: Option<Uuid>,
    /// Posted counterpart account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterpart_account: Option<String>,
    /// Classification certainty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    /// Rule that settled an expense or invoice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    /// Error code of a failed line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Error text of a failed line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LineOutcome {
    fn new(line: &StatementLine, status: LineStatus) -> Self {
        Self {
            date: line.date,
            description: line.description.clone(),
            amount: line.amount,
            direction: line.direction,
            status,
            bank_transaction_id: None,
            counterpart_account: None,
            confidence: None,
            rule: None,
            error: None,
            message: None,
        }
    }
}

/// Import summary.
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    /// Lines stored.
    pub imported: usize,
    /// Lines already known.
    pub skipped: usize,
    /// Lines rejected.
    pub failed: usize,
    /// Rows of the file that could not be read.
    pub warnings: Vec<String>,
    /// One outcome per readable line, in file order.
    pub lines: Vec<LineOutcome>,
}

/// What auto-classification works from.
struct ImportContext {
    classifier: Classifier,
    clients: ClientDirectory,
    rules: Vec<ReconciliationRule>,
    expenses: Vec<ExpenseCandidate>,
    invoices: Vec<InvoiceCandidate>,
    chart_accounts: Vec<contta_core::classification::ChartAccount>,
}

impl ImportContext {
    async fn load(state: &AppState, tenant_id: Uuid) -> ApiResult<Self> {
        let db = (*state.db).clone();
        let classifier = Classifier::new().map_err(|e| ApiError::internal(e.to_string()))?;
        let chart_accounts = if state.advisor.is_some() {
            AccountRepository::new(db.clone())
                .chart_for_advisor(tenant_id)
                .await?
        } else {
            Vec::new()
        };
        Ok(Self {
            classifier,
            clients: ClientRepository::new(db.clone()).directory(tenant_id).await?,
            rules: ReconciliationRepository::new(db.clone())
                .active_rules(tenant_id)
                .await?,
            expenses: ExpenseRepository::new(db.clone()).candidates(tenant_id).await?,
            invoices: InvoiceRepository::new(db).candidates(tenant_id).await?,
            chart_accounts,
        })
    }

    /// Rule-based result, refined by the advisor when one is configured.
    async fn classify(&self, state: &AppState, line: &StatementLine) -> Classification {
        let classification = self
            .classifier
            .classify(line, &self.clients, &state.config.chart);
        match state.advisor.as_deref() {
            Some(advisor) => {
                refine_with_advisor(
                    classification,
                    line,
                    &self.chart_accounts,
                    &state.config.chart,
                    advisor,
                    state.min_confidence,
                )
                .await
                .classification
            }
            None => classification,
        }
    }

    /// A settled record cannot be matched twice in one file.
    fn consume(&mut self, target: RuleTarget) {
        match target {
            RuleTarget::Expense(id) => self.expenses.retain(|e| e.expense_id != id),
            RuleTarget::Invoice(id) => self.invoices.retain(|i| i.invoice_id != id),
        }
    }
}

/// POST `/tenants/{tenant_id}/bank-transactions/import` - Imports a statement.
///
/// Each line is stored and posted in its own transaction, so one rejected
/// line (closed month, unknown account) does not affect the others.
async fn import_statement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
    Json(payload): Json<ImportRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.authorize(tenant_id, Access::Write)?;
    let format: StatementFormat = payload.format.parse()?;
    let parsed = parse_statement(format, &payload.content)?;

    let repo = BankTransactionRepository::new((*state.db).clone());
    let keys: Vec<String> = parsed.lines.iter().map(idempotency_key).collect();
    let mut seen = repo.existing_keys(tenant_id, &keys).await?;
    let mut context = if payload.auto_classify {
        Some(ImportContext::load(&state, tenant_id).await?)
    } else {
        None
    };

    let mut outcomes = Vec::with_capacity(parsed.lines.len());
    for (line, key) in parsed.lines.iter().zip(keys) {
        if seen.contains(&key) {
            outcomes.push(LineOutcome::new(line, LineStatus::Skipped));
            continue;
        }

        let rule_hit = context
            .as_ref()
            .and_then(|c| apply_rules(line, &c.rules, &c.expenses, &c.invoices));
        let classification = match (&context, &rule_hit) {
            (Some(c), None) => Some(c.classify(&state, line).await),
            _ => None,
        };
        let posting = match (&rule_hit, &classification) {
            (Some(hit), _) => Posting::Rule(hit),
            (None, Some(classification)) => Posting::Classified(classification),
            (None, None) => Posting::None,
        };

        let new = NewBankLine {
            line,
            idempotency_key: key.clone(),
            bank_account_id: payload.bank_account_id,
            import_file: payload.file_name.clone(),
        };
        let mut outcome = LineOutcome::new(line, LineStatus::Imported);
        match repo
            .import_line(tenant_id, &new, posting, &state.config.chart, auth.user_id())
            .await
        {
            Ok(row) => {
                outcome.bank_transaction_id = Some(row.id);
                outcome.counterpart_account = row.counterpart_account;
                outcome.confidence = classification.as_ref().map(|c| c.confidence);
                if let Some(hit) = &rule_hit {
                    outcome.rule = Some(hit.rule_name.clone());
                    if let Some(c) = context.as_mut() {
                        c.consume(hit.target);
                    }
                }
                seen.insert(key);
            }
            Err(e) => {
                let err = ApiError::from(e);
                warn!(
                    tenant_id = %tenant_id,
                    date = %line.date,
                    error = err.code(),
                    "Statement line rejected"
                );
                outcome.status = LineStatus::Failed;
                outcome.error = Some(err.code().to_string());
                outcome.message = Some(err.public_message().to_string());
            }
        }
        outcomes.push(outcome);
    }

    let count = |status: LineStatus| outcomes.iter().filter(|o| o.status == status).count();
    let response = ImportResponse {
        imported: count(LineStatus::Imported),
        skipped: count(LineStatus::Skipped),
        failed: count(LineStatus::Failed),
        warnings: parsed.warnings,
        lines: outcomes,
    };
    info!(
        tenant_id = %tenant_id,
        imported = response.imported,
        skipped = response.skipped,
        failed = response.failed,
        "Statement imported"
    );
    Ok((StatusCode::OK, Json(response)))
}

/// Query parameters for listing bank transactions.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// pending, reconciled or ignored.
    pub status: Option<String>,
    /// On or after.
    pub from: Option<NaiveDate>,
    /// On or before.
    pub to: Option<NaiveDate>,
    /// Page number (1-indexed, default: 1).
    pub page: Option<u32>,
    /// Items per page (default: 50).
    pub per_page: Option<u32>,
}

/// GET `/tenants/{tenant_id}/bank-transactions` - Lists imported lines.
async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
    Query(query): Query<ListTransactionsQuery>,
) -> ApiResult<Json<PageResponse<bank_transactions::Model>>> {
    auth.authorize(tenant_id, Access::Read)?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<BankLineStatus>)
        .transpose()
        .map_err(|e| ApiError::bad_request("invalid_status", e))?;
    let filter = BankTxFilter {
        status,
        from: query.from,
        to: query.to,
    };
    let page = PageRequest::new(query.page, query.per_page);
    let (rows, total) = BankTransactionRepository::new((*state.db).clone())
        .list(tenant_id, &filter, &page)
        .await?;
    Ok(Json(PageResponse::new(rows, &page, total)))
}

/// GET `/tenants/{tenant_id}/bank-transactions/{id}` - One imported line.
async fn get_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((tenant_id, id)): Path<TenantRecord>,
) -> ApiResult<Json<bank_transactions::Model>> {
    auth.authorize(tenant_id, Access::Read)?;
    let row = BankTransactionRepository::new((*state.db).clone())
        .find(tenant_id, id)
        .await?;
    Ok(Json(row))
}

/// Request body for reclassifying a parked line.
#[derive(Debug, Deserialize)]
pub struct ReclassifyRequest {
    /// Account the amount moves to.
    pub account_code: String,
}

/// POST `/tenants/{tenant_id}/bank-transactions/{id}/reclassify` - Moves a
/// parked amount out of its transitory or pending account.
async fn reclassify(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((tenant_id, id)): Path<TenantRecord>,
    Json(payload): Json<ReclassifyRequest>,
) -> ApiResult<Json<bank_transactions::Model>> {
    auth.authorize(tenant_id, Access::Write)?;
    let account_code = payload.account_code.trim();
    if account_code.is_empty() {
        return Err(ApiError::bad_request(
            "invalid_account_code",
            "account_code is required",
        ));
    }
    let row = BankTransactionRepository::new((*state.db).clone())
        .reclassify(tenant_id, id, account_code, &state.config.chart, auth.user_id())
        .await?;
    Ok(Json(row))
}

/// Request body for splitting a grouped collection.
#[derive(Debug, Deserialize)]
pub struct SplitBody {
    /// One share per paying client.
    pub allocations: Vec<SplitRequest>,
}

/// Split result.
#[derive(Debug, Serialize)]
pub struct SplitResponse {
    /// Split entry.
    pub entry_id: Uuid,
    /// Shares posted.
    pub allocations: usize,
}

/// POST `/tenants/{tenant_id}/bank-transactions/{id}/split` - Distributes a
/// collection among client accounts and settles the named invoices.
async fn split(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((tenant_id, id)): Path<TenantRecord>,
    Json(payload): Json<SplitBody>,
) -> ApiResult<impl IntoResponse> {
    auth.authorize(tenant_id, Access::Write)?;
    let entry_id = BankTransactionRepository::new((*state.db).clone())
        .split(
            tenant_id,
            id,
            &payload.allocations,
            &state.config.chart,
            auth.user_id(),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SplitResponse {
            entry_id,
            allocations: payload.allocations.len(),
        }),
    ))
}

/// Classification preview.
#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    /// Rule-based result.
    pub classification: Classification,
    /// Advisor answer, when enabled and reachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<AdvisorSuggestion>,
    /// Why the advisor gave no answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisor_error: Option<String>,
}

/// POST `/tenants/{tenant_id}/bank-transactions/{id}/suggest` - Classifies a
/// stored line without posting anything.
async fn suggest(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((tenant_id, id)): Path<TenantRecord>,
) -> ApiResult<Json<SuggestResponse>> {
    auth.authorize(tenant_id, Access::Write)?;
    let db = (*state.db).clone();
    let row = BankTransactionRepository::new(db.clone())
        .find(tenant_id, id)
        .await?;
    let line = to_statement_line(&row)?;

    let clients = ClientRepository::new(db.clone()).directory(tenant_id).await?;
    let classifier = Classifier::new().map_err(|e| ApiError::internal(e.to_string()))?;
    let classification = classifier.classify(&line, &clients, &state.config.chart);

    let mut response = SuggestResponse {
        classification,
        suggestion: None,
        advisor_error: None,
    };
    if let Some(advisor) = state.advisor.as_deref() {
        let chart = AccountRepository::new(db).chart_for_advisor(tenant_id).await?;
        match ClassificationAdvisor::suggest(advisor, &line, &chart).await {
            Ok(suggestion) => response.suggestion = Some(suggestion),
            Err(e) => {
                warn!(tenant_id = %tenant_id, bank_transaction_id = %id, error = %e, "Advisor failed");
                response.advisor_error = Some(e.to_string());
            }
        }
    }
    Ok(Json(response))
}
