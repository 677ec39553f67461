//! Month-end closing routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use contta_core::closing::ClosingEvaluation;
use contta_db::ClosingRepository;
use contta_db::entities::monthly_closings;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Serialize;
use uuid::Uuid;

use super::parse_period;
use crate::error::ApiResult;
use crate::middleware::{Access, AuthUser};
use crate::AppState;

/// Creates the closing routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tenants/{tenant_id}/closings", get(list_closings))
        .route("/tenants/{tenant_id}/closings/{period}", get(get_closing))
        .route("/tenants/{tenant_id}/closings/{period}/evaluate", post(evaluate_closing))
        .route("/tenants/{tenant_id}/closings/{period}/sign-off", post(sign_off_closing))
        .route("/tenants/{tenant_id}/closings/{period}/reopen", post(reopen_closing))
}

/// A stored closing.
#[derive(Debug, Serialize)]
pub struct ClosingResponse {
    /// Row id.
    pub id: Uuid,
    /// `YYYY-MM`.
    pub period: String,
    /// open, blocked, authorized, closed or reopened.
    pub status: String,
    /// Decision of the last evaluation.
    pub decision: Option<String>,
    /// Must-fix items of the last evaluation.
    pub must_fix: serde_json::Value,
    /// Hash of the evaluated input.
    pub input_hash: Option<String>,
    /// Last evaluation.
    pub evaluated_at: Option<DateTimeWithTimeZone>,
    /// Who evaluated.
    pub evaluated_by: Option<Uuid>,
    /// Sign-off.
    pub closed_at: Option<DateTimeWithTimeZone>,
    /// Who signed off.
    pub closed_by: Option<Uuid>,
    /// Last reopening.
    pub reopened_at: Option<DateTimeWithTimeZone>,
    /// Who reopened.
    pub reopened_by: Option<Uuid>,
}

impl From<monthly_closings::Model> for ClosingResponse {
    fn from(row: monthly_closings::Model) -> Self {
        Self {
            id: row.id,
            period: row.period,
            status: row.status,
            decision: row.decision,
            must_fix: row.must_fix,
            input_hash: row.input_hash,
            evaluated_at: row.evaluated_at,
            evaluated_by: row.evaluated_by,
            closed_at: row.closed_at,
            closed_by: row.closed_by,
            reopened_at: row.reopened_at,
            reopened_by: row.reopened_by,
        }
    }
}

/// GET `/tenants/{tenant_id}/closings` - Closings, newest period first.
async fn list_closings(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ClosingResponse>>> {
    auth.authorize(tenant_id, Access::Read)?;
    let rows = ClosingRepository::new((*state.db).clone())
        .list(tenant_id)
        .await?;
    Ok(Json(rows.into_iter().map(ClosingResponse::from).collect()))
}

/// GET `/tenants/{tenant_id}/closings/{period}` - Current state of a month.
async fn get_closing(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((tenant_id, period)): Path<(Uuid, String)>,
) -> ApiResult<Json<ClosingResponse>> {
    auth.authorize(tenant_id, Access::Read)?;
    let period = parse_period(&period)?;
    let row = ClosingRepository::new((*state.db).clone())
        .find(tenant_id, period)
        .await?;
    Ok(Json(row.into()))
}

/// POST `/tenants/{tenant_id}/closings/{period}/evaluate` - Evaluates and
/// stores the decision. A blocked month is a successful evaluation.
async fn evaluate_closing(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((tenant_id, period)): Path<(Uuid, String)>,
) -> ApiResult<Json<ClosingEvaluation>> {
    auth.authorize(tenant_id, Access::Write)?;
    let period = parse_period(&period)?;
    let evaluation = ClosingRepository::new((*state.db).clone())
        .evaluate(tenant_id, period, &state.config.chart, auth.user_id())
        .await?;
    Ok(Json(evaluation))
}

/// POST `/tenants/{tenant_id}/closings/{period}/sign-off` - Closes an
/// authorized month whose input is unchanged.
async fn sign_off_closing(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((tenant_id, period)): Path<(Uuid, String)>,
) -> ApiResult<Json<ClosingResponse>> {
    auth.authorize(tenant_id, Access::SignOff)?;
    let period = parse_period(&period)?;
    let row = ClosingRepository::new((*state.db).clone())
        .sign_off(tenant_id, period, &state.config.chart, auth.user_id())
        .await?;
    Ok(Json(row.into()))
}

/// POST `/tenants/{tenant_id}/closings/{period}/reopen` - Reopens a closed month.
async fn reopen_closing(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((tenant_id, period)): Path<(Uuid, String)>,
) -> ApiResult<Json<ClosingResponse>> {
    auth.authorize(tenant_id, Access::Reopen)?;
    let period = parse_period(&period)?;
    let row = ClosingRepository::new((*state.db).clone())
        .reopen(tenant_id, period, auth.user_id())
        .await?;
    Ok(Json(row.into()))
}
