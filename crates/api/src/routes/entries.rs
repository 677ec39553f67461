//! Journal entry routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::NaiveDate;
use contta_core::ledger::{EntryDraft, EntryLine, EntryType};
use contta_db::EntryRepository;
use contta_db::entities::{accounting_entries, accounting_entry_lines};
use contta_db::repositories::EntryWithLines;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{Access, AuthUser};

/// Creates the entry routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/tenants/{tenant_id}/entries",
        get(list_entries).post(create_entry),
    )
}

/// Query parameters for listing entries.
#[derive(Debug, Deserialize)]
pub struct ListEntriesQuery {
    /// Start date filter (inclusive, YYYY-MM-DD format).
    pub from: Option<NaiveDate>,
    /// End date filter (inclusive, YYYY-MM-DD format).
    pub to: Option<NaiveDate>,
}

/// Request body for a manual entry.
#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    /// Entry date; its month must not be closed.
    pub date: NaiveDate,
    /// History.
    pub description: String,
    /// Balanced debit and credit lines.
    pub lines: Vec<EntryLine>,
}

/// An entry with its lines.
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    /// Header.
    #[serde(flatten)]
    pub entry: accounting_entries::Model,
    /// Lines in order.
    pub lines: Vec<accounting_entry_lines::Model>,
}

impl From<EntryWithLines> for EntryResponse {
    fn from(e: EntryWithLines) -> Self {
        Self {
            entry: e.entry,
            lines: e.lines,
        }
    }
}

/// GET `/tenants/{tenant_id}/entries` - Entries within a date range.
async fn list_entries(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
    Query(query): Query<ListEntriesQuery>,
) -> ApiResult<Json<Vec<EntryResponse>>> {
    auth.authorize(tenant_id, Access::Read)?;
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(ApiError::bad_request(
                "invalid_range",
                "from must not be after to",
            ));
        }
    }
    let entries = EntryRepository::new((*state.db).clone())
        .list(tenant_id, query.from, query.to)
        .await?;
    Ok(Json(entries.into_iter().map(EntryResponse::from).collect()))
}

/// Created entry.
#[derive(Debug, Serialize)]
pub struct CreatedEntry {
    /// Entry id.
    pub id: Uuid,
}

/// POST `/tenants/{tenant_id}/entries` - Posts a manual entry.
async fn create_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
    Json(payload): Json<CreateEntryRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.authorize(tenant_id, Access::Write)?;
    let draft = EntryDraft::new(
        payload.date,
        payload.description.trim(),
        EntryType::Manual,
        payload.lines,
    );
    let id = EntryRepository::new((*state.db).clone())
        .post(tenant_id, &draft, auth.user_id())
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedEntry { id })))
}
