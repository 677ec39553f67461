//! Accounting report routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use chrono::NaiveDate;
use contta_core::ledger::chart::is_valid_code;
use contta_core::reports::{
    AccountLedgerReport, BalanceSheetReport, IncomeStatementReport, TrialBalanceReport,
    ensure_range,
};
use contta_db::ReportRepository;
use contta_shared::types::{FiscalMonth, today_brazil};
use serde::Deserialize;
use uuid::Uuid;

use super::parse_period;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{Access, AuthUser};
use crate::AppState;

/// Creates the report routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tenants/{tenant_id}/reports/trial-balance", get(get_trial_balance))
        .route(
            "/tenants/{tenant_id}/reports/income-statement",
            get(get_income_statement),
        )
        .route("/tenants/{tenant_id}/reports/balance-sheet", get(get_balance_sheet))
        .route(
            "/tenants/{tenant_id}/reports/ledger/{account_code}",
            get(get_account_ledger),
        )
}

/// Query parameters for the trial balance.
#[derive(Debug, Deserialize)]
pub struct TrialBalanceQuery {
    /// `YYYY-MM`; defaults to the current month in Brazil.
    pub period: Option<String>,
}

/// Query parameters for reports over a date range.
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    /// `YYYY-MM`, shorthand for its first and last day.
    pub period: Option<String>,
    /// Start date (inclusive, YYYY-MM-DD format).
    pub from: Option<NaiveDate>,
    /// End date (inclusive, YYYY-MM-DD format).
    pub to: Option<NaiveDate>,
}

impl RangeQuery {
    /// Resolves the range: `period` wins, otherwise both dates are required.
    fn resolve(&self) -> Result<(NaiveDate, NaiveDate), ApiError> {
        if let Some(period) = &self.period {
            let period = parse_period(period)?;
            return Ok((period.first_day(), period.last_day()));
        }
        let (Some(from), Some(to)) = (self.from, self.to) else {
            return Err(ApiError::bad_request(
                "missing_range",
                "Provide period or both from and to",
            ));
        };
        ensure_range(from, to)?;
        Ok((from, to))
    }
}

/// Query parameters for the balance sheet.
#[derive(Debug, Deserialize)]
pub struct BalanceSheetQuery {
    /// Date of the balances; defaults to today in Brazil.
    pub as_of: Option<NaiveDate>,
}

/// GET `/tenants/{tenant_id}/reports/trial-balance` - Balancete of a month.
async fn get_trial_balance(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
    Query(query): Query<TrialBalanceQuery>,
) -> ApiResult<Json<TrialBalanceReport>> {
    auth.authorize(tenant_id, Access::Read)?;
    let period = match query.period.as_deref() {
        Some(period) => parse_period(period)?,
        None => FiscalMonth::current_brazil(),
    };
    let report = ReportRepository::new((*state.db).clone())
        .trial_balance(tenant_id, period)
        .await?;
    Ok(Json(report))
}

/// GET `/tenants/{tenant_id}/reports/income-statement` - DRE of a month or
/// date range.
async fn get_income_statement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<IncomeStatementReport>> {
    auth.authorize(tenant_id, Access::Read)?;
    let (from, to) = query.resolve()?;
    let report = ReportRepository::new((*state.db).clone())
        .income_statement(tenant_id, from, to)
        .await?;
    Ok(Json(report))
}

/// GET `/tenants/{tenant_id}/reports/balance-sheet` - Balanço patrimonial.
async fn get_balance_sheet(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
    Query(query): Query<BalanceSheetQuery>,
) -> ApiResult<Json<BalanceSheetReport>> {
    auth.authorize(tenant_id, Access::Read)?;
    let as_of = query.as_of.unwrap_or_else(today_brazil);
    let report = ReportRepository::new((*state.db).clone())
        .balance_sheet(tenant_id, as_of)
        .await?;
    Ok(Json(report))
}

/// GET `/tenants/{tenant_id}/reports/ledger/{account_code}` - Razão of an
/// account, with opening and running balances.
async fn get_account_ledger(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((tenant_id, account_code)): Path<(Uuid, String)>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<AccountLedgerReport>> {
    auth.authorize(tenant_id, Access::Read)?;
    if !is_valid_code(&account_code) {
        return Err(ApiError::bad_request(
            "invalid_account_code",
            format!("Invalid account code '{account_code}'"),
        ));
    }
    let (from, to) = query.resolve()?;
    let report = ReportRepository::new((*state.db).clone())
        .account_ledger(tenant_id, &account_code, from, to)
        .await?;
    Ok(Json(report))
}
