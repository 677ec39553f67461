//! API route definitions.

use axum::{Router, middleware};
use contta_shared::types::FiscalMonth;
use uuid::Uuid;

use crate::error::ApiError;
use crate::{AppState, middleware::auth_middleware};

pub mod accounts;
pub mod bank_transactions;
pub mod clients;
pub mod closings;
pub mod entries;
pub mod expenses;
pub mod health;
pub mod invoices;
pub mod reconciliations;
pub mod reports;
pub mod webhooks;

/// Creates the API router: public routes plus the authenticated tenant
/// routes.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(closings::routes())
        .merge(bank_transactions::routes())
        .merge(reconciliations::routes())
        .merge(clients::routes())
        .merge(invoices::routes())
        .merge(expenses::routes())
        .merge(accounts::routes())
        .merge(entries::routes())
        .merge(reports::routes())
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .merge(health::routes())
        .merge(webhooks::routes())
        .merge(protected_routes)
}

/// Parses a `YYYY-MM` path or body value.
pub(crate) fn parse_period(value: &str) -> Result<FiscalMonth, ApiError> {
    value
        .parse()
        .map_err(|e: contta_shared::types::FiscalMonthParseError| {
            ApiError::bad_request("invalid_period", e.to_string())
        })
}

/// Path of routes addressing one record of a tenant.
pub(crate) type TenantRecord = (Uuid, Uuid);
