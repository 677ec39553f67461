//! Client registration routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use contta_core::client::{TaxDocument, validate_client};
use contta_db::ClientRepository;
use contta_db::entities::clients;
use contta_db::repositories::{ClientFilter, CreateClientInput, UpdateClientInput};
use contta_shared::types::{PageRequest, PageResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TenantRecord;
use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{Access, AuthUser};

/// Creates the client routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/tenants/{tenant_id}/clients",
            get(list_clients).post(create_client),
        )
        .route(
            "/tenants/{tenant_id}/clients/{id}",
            get(get_client).patch(update_client),
        )
        .route("/tenants/{tenant_id}/clients/{id}/deactivate", post(deactivate_client))
}

/// Query parameters for listing clients.
#[derive(Debug, Deserialize)]
pub struct ListClientsQuery {
    /// Filter by active status.
    pub active: Option<bool>,
    /// Name fragment.
    pub search: Option<String>,
    /// Page number (1-indexed, default: 1).
    pub page: Option<u32>,
    /// Items per page (default: 50).
    pub per_page: Option<u32>,
}

/// Request body for registering a client.
#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    /// Company or person name.
    pub name: String,
    /// CNPJ or CPF, punctuation allowed.
    pub document: String,
    /// Contact email.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Contracted monthly fee (default: zero).
    #[serde(default)]
    pub monthly_fee: Decimal,
}

/// Request body for updating a client.
#[derive(Debug, Deserialize)]
pub struct UpdateClientRequest {
    /// Name.
    pub name: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Monthly fee.
    pub monthly_fee: Option<Decimal>,
}

/// Response for a client.
#[derive(Debug, Serialize)]
pub struct ClientResponse {
    /// Client ID.
    pub id: Uuid,
    /// Name.
    pub name: String,
    /// Digits-only document.
    pub document: String,
    /// Punctuated document.
    pub document_formatted: String,
    /// `cnpj` or `cpf`.
    pub document_kind: String,
    /// Contact email.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Monthly fee.
    pub monthly_fee: Decimal,
    /// Receivable account of the client.
    pub account_code: String,
    /// Whether the client is active.
    pub is_active: bool,
}

impl From<clients::Model> for ClientResponse {
    fn from(c: clients::Model) -> Self {
        let document_formatted = TaxDocument::parse(&c.document)
            .map_or_else(|_| c.document.clone(), |d| d.formatted());
        Self {
            id: c.id,
            name: c.name,
            document: c.document,
            document_formatted,
            document_kind: c.document_kind,
            email: c.email,
            phone: c.phone,
            monthly_fee: c.monthly_fee,
            account_code: c.account_code,
            is_active: c.is_active,
        }
    }
}

/// GET `/tenants/{tenant_id}/clients` - Lists clients by name.
async fn list_clients(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
    Query(query): Query<ListClientsQuery>,
) -> ApiResult<Json<PageResponse<ClientResponse>>> {
    auth.authorize(tenant_id, Access::Read)?;
    let filter = ClientFilter {
        is_active: query.active,
        search: query.search,
    };
    let page = PageRequest::new(query.page, query.per_page);
    let (rows, total) = ClientRepository::new((*state.db).clone())
        .list(tenant_id, &filter, &page)
        .await?;
    Ok(Json(PageResponse::new(
        rows.into_iter().map(ClientResponse::from).collect(),
        &page,
        total,
    )))
}

/// POST `/tenants/{tenant_id}/clients` - Registers a client and opens its
/// receivable account.
async fn create_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
    Json(payload): Json<CreateClientRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.authorize(tenant_id, Access::Write)?;
    let client = validate_client(&payload.name, &payload.document, payload.monthly_fee)?;
    let input = CreateClientInput {
        client,
        email: payload.email,
        phone: payload.phone,
    };
    let created = ClientRepository::new((*state.db).clone())
        .create(tenant_id, input, &state.config.chart)
        .await?;
    Ok((StatusCode::CREATED, Json(ClientResponse::from(created))))
}

/// GET `/tenants/{tenant_id}/clients/{id}` - One client.
async fn get_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((tenant_id, id)): Path<TenantRecord>,
) -> ApiResult<Json<ClientResponse>> {
    auth.authorize(tenant_id, Access::Read)?;
    let client = ClientRepository::new((*state.db).clone())
        .find(tenant_id, id)
        .await?;
    Ok(Json(client.into()))
}

/// PATCH `/tenants/{tenant_id}/clients/{id}` - Updates contact data or fee.
async fn update_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((tenant_id, id)): Path<TenantRecord>,
    Json(payload): Json<UpdateClientRequest>,
) -> ApiResult<Json<ClientResponse>> {
    auth.authorize(tenant_id, Access::Write)?;
    let name = match payload.name {
        Some(name) => {
            let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
            if name.is_empty() {
                return Err(ApiError::bad_request("empty_name", "Client name is required"));
            }
            Some(name)
        }
        None => None,
    };
    if payload.monthly_fee.is_some_and(|fee| fee < Decimal::ZERO) {
        return Err(ApiError::bad_request(
            "negative_fee",
            "Monthly fee cannot be negative",
        ));
    }
    let input = UpdateClientInput {
        name,
        email: payload.email,
        phone: payload.phone,
        monthly_fee: payload.monthly_fee,
    };
    let client = ClientRepository::new((*state.db).clone())
        .update(tenant_id, id, input)
        .await?;
    Ok(Json(client.into()))
}

/// POST `/tenants/{tenant_id}/clients/{id}/deactivate` - Deactivates a client.
async fn deactivate_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((tenant_id, id)): Path<TenantRecord>,
) -> ApiResult<Json<ClientResponse>> {
    auth.authorize(tenant_id, Access::Write)?;
    let client = ClientRepository::new((*state.db).clone())
        .deactivate(tenant_id, id)
        .await?;
    Ok(Json(client.into()))
}
