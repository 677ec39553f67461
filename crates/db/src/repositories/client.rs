//! Client repository.
//!
//! Registering a client also opens its analytical receivable account under
//! the configured parent, in the same transaction.

use chrono::Utc;
use contta_core::billing::FeeClient;
use contta_core::classification::{ClientDirectory, KnownClient};
use contta_core::client::ValidClient;
use contta_core::ledger::{ChartCodes, LedgerError, next_client_account_code};
use contta_shared::types::PageRequest;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::account::{AccountError, CreateAccountInput, insert_account};
use crate::entities::{chart_of_accounts, clients};
use crate::rls::RlsConnection;

/// Error types for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientRepoError {
    /// Client not found.
    #[error("Client not found: {0}")]
    NotFound(Uuid),

    /// Another client of the tenant has the same CNPJ/CPF.
    #[error("A client with document {0} already exists")]
    DuplicateDocument(String),

    /// Could not open the receivable account.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// No free receivable code.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for registering a client.
#[derive(Debug, Clone)]
pub struct CreateClientInput {
    /// Validated name, document and fee.
    pub client: ValidClient,
    /// Contact e-mail.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
}

/// Fields a client update may change. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct UpdateClientInput {
    /// New name.
    pub name: Option<String>,
    /// New e-mail.
    pub email: Option<String>,
    /// New phone.
    pub phone: Option<String>,
    /// New monthly fee.
    pub monthly_fee: Option<Decimal>,
}

/// Filter for listing clients.
#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    /// `Some(true)` active only, `Some(false)` inactive only.
    pub is_active: Option<bool>,
    /// Case-insensitive name fragment.
    pub search: Option<String>,
}

/// Repository for client operations.
pub struct ClientRepository {
    db: DatabaseConnection,
}

impl ClientRepository {
    /// Creates a new client repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Registers a client and opens its receivable account.
    pub async fn create(
        &self,
        tenant_id: Uuid,
        input: CreateClientInput,
        chart: &ChartCodes,
    ) -> Result<clients::Model, ClientRepoError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let txn = rls.transaction();
        let document = input.client.document.digits().to_string();

        let duplicate = clients::Entity::find()
            .filter(clients::Column::TenantId.eq(tenant_id))
            .filter(clients::Column::Document.eq(document.as_str()))
            .count(txn)
            .await?;
        if duplicate > 0 {
            return Err(ClientRepoError::DuplicateDocument(document));
        }

        let prefix = format!("{}.", chart.client_receivables);
        let taken: Vec<String> = chart_of_accounts::Entity::find()
            .filter(chart_of_accounts::Column::TenantId.eq(tenant_id))
            .filter(chart_of_accounts::Column::Code.starts_with(prefix.as_str()))
            .all(txn)
            .await?
            .into_iter()
            .map(|a| a.code)
            .collect();
        let account_code =
            next_client_account_code(&chart.client_receivables, taken.iter().map(String::as_str))?;

        insert_account(
            txn,
            tenant_id,
            &CreateAccountInput {
                code: account_code.clone(),
                name: format!("Cliente - {}", input.client.name),
                is_analytical: true,
            },
        )
        .await?;

        let now = Utc::now().into();
        let client = clients::ActiveModel {
            id: Set(Uuid::now_v7()),
            tenant_id: Set(tenant_id),
            name: Set(input.client.name),
            document: Set(document),
            document_kind: Set(input.client.document.kind().as_str().to_string()),
            email: Set(input.email),
            phone: Set(input.phone),
            monthly_fee: Set(input.client.monthly_fee),
            account_code: Set(account_code),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await?;

        rls.commit().await?;
        tracing::info!(
            tenant_id = %tenant_id,
            client_id = %client.id,
            account_code = %client.account_code,
            "Client registered"
        );
        Ok(client)
    }

    /// Finds a client by id.
    pub async fn find(&self, tenant_id: Uuid, id: Uuid) -> Result<clients::Model, ClientRepoError> {
        clients::Entity::find_by_id(id)
            .filter(clients::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await?
            .ok_or(ClientRepoError::NotFound(id))
    }

    /// Lists clients by name. Returns the page and the total count.
    pub async fn list(
        &self,
        tenant_id: Uuid,
        filter: &ClientFilter,
        page: &PageRequest,
    ) -> Result<(Vec<clients::Model>, u64), DbErr> {
        let mut query =
            clients::Entity::find().filter(clients::Column::TenantId.eq(tenant_id));
        if let Some(active) = filter.is_active {
            query = query.filter(clients::Column::IsActive.eq(active));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(
                sea_orm::sea_query::Expr::cust_with_values(
                    "name ILIKE $1",
                    [format!("%{}%", search.trim())],
                ),
            );
        }

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_asc(clients::Column::Name)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok((rows, total))
    }

    /// Updates contact data or fee.
    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateClientInput,
    ) -> Result<clients::Model, ClientRepoError> {
        let existing = self.find(tenant_id, id).await?;
        let mut active = existing.into_active_model();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(email) = input.email {
            active.email = Set(Some(email));
        }
        if let Some(phone) = input.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(fee) = input.monthly_fee {
            active.monthly_fee = Set(fee);
        }
        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&self.db).await?)
    }

    /// Marks a client inactive. Its history and account are kept.
    pub async fn deactivate(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<clients::Model, ClientRepoError> {
        let existing = self.find(tenant_id, id).await?;
        let mut active = existing.into_active_model();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now().into());
        let client = active.update(&self.db).await?;
        tracing::info!(tenant_id = %tenant_id, client_id = %id, "Client deactivated");
        Ok(client)
    }

    /// Active clients, as searched when identifying payers.
    pub async fn directory(&self, tenant_id: Uuid) -> Result<ClientDirectory, DbErr> {
        let clients = clients::Entity::find()
            .filter(clients::Column::TenantId.eq(tenant_id))
            .filter(clients::Column::IsActive.eq(true))
            .all(&self.db)
            .await?;
        Ok(ClientDirectory::new(
            clients
                .into_iter()
                .map(|c| KnownClient {
                    client_id: c.id,
                    name: c.name,
                    document: c.document,
                    account_code: c.account_code,
                })
                .collect(),
        ))
    }

    /// All clients, as seen by fee generation.
    pub async fn fee_clients(&self, tenant_id: Uuid) -> Result<Vec<FeeClient>, DbErr> {
        let clients = clients::Entity::find()
            .filter(clients::Column::TenantId.eq(tenant_id))
            .order_by_asc(clients::Column::Name)
            .all(&self.db)
            .await?;
        Ok(clients.into_iter().map(to_fee_client).collect())
    }
}

fn to_fee_client(client: clients::Model) -> FeeClient {
    FeeClient {
        client_id: client.id,
        name: client.name,
        monthly_fee: client.monthly_fee,
        is_active: client.is_active,
        account_code: client.account_code,
    }
}
