//! Tenant repository. A tenant is one bookkeeping office.

use chrono::Utc;
use contta_core::ledger::ChartCodes;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};
use uuid::Uuid;

use super::account::{AccountError, seed_standard_chart};
use crate::entities::tenants;
use crate::rls::RlsConnection;

/// Input for creating a tenant.
#[derive(Debug, Clone)]
pub struct CreateTenantInput {
    /// Office name.
    pub name: String,
    /// Office CNPJ, digits only.
    pub document: Option<String>,
}

/// Repository for tenant operations.
#[derive(Debug, Clone)]
pub struct TenantRepository {
    db: DatabaseConnection,
}

impl TenantRepository {
    /// Creates a new tenant repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a tenant by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<tenants::Model>, DbErr> {
        let rls = RlsConnection::new(&self.db, id).await?;
        let tenant = tenants::Entity::find_by_id(id).one(rls.transaction()).await?;
        rls.commit().await?;
        Ok(tenant)
    }

    /// Creates a tenant with the standard chart of accounts. Returns the
    /// tenant and how many accounts were seeded.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; nothing is kept in that case.
    pub async fn create_with_chart(
        &self,
        input: &CreateTenantInput,
        chart: &ChartCodes,
    ) -> Result<(tenants::Model, usize), AccountError> {
        let id = Uuid::now_v7();
        let rls = RlsConnection::new(&self.db, id).await?;
        let txn = rls.transaction();

        let now = Utc::now().into();
        let tenant = tenants::ActiveModel {
            id: Set(id),
            name: Set(input.name.trim().to_string()),
            document: Set(input.document.clone()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await?;
        let seeded = seed_standard_chart(txn, id, chart).await?;

        rls.commit().await?;
        tracing::info!(tenant_id = %id, accounts = seeded, "Tenant created");
        Ok((tenant, seeded))
    }
}
