//! Account repository for chart of accounts database operations.

use std::collections::HashSet;

use chrono::Utc;
use contta_core::classification::ChartAccount;
use contta_core::ledger::{AccountType, ChartCodes, account_type_for_code, standard_chart};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entities::chart_of_accounts;
use crate::rls::RlsConnection;

/// Error types for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Account code already exists for the tenant.
    #[error("Account code '{0}' already exists")]
    DuplicateCode(String),

    /// Code is not a dotted numeric path.
    #[error("Invalid account code '{0}'")]
    InvalidCode(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Dotted code, e.g. `4.1.1.04`.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Whether entries may post to it.
    pub is_analytical: bool,
}

/// Filter for listing accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    /// Only accounts that accept postings.
    pub analytical_only: bool,
    /// Include deactivated accounts.
    pub include_inactive: bool,
}

/// Derives the group of a new account from its code.
pub fn resolve_account_type(code: &str) -> Result<AccountType, AccountError> {
    if !contta_core::ledger::chart::is_valid_code(code) {
        return Err(AccountError::InvalidCode(code.to_string()));
    }
    account_type_for_code(code).ok_or_else(|| AccountError::InvalidCode(code.to_string()))
}

/// Inserts an account on the caller's connection.
pub async fn insert_account<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    input: &CreateAccountInput,
) -> Result<chart_of_accounts::Model, AccountError> {
    let account_type = resolve_account_type(&input.code)?;
    if code_exists(conn, tenant_id, &input.code).await? {
        return Err(AccountError::DuplicateCode(input.code.clone()));
    }

    let account = chart_of_accounts::ActiveModel {
        id: Set(Uuid::now_v7()),
        tenant_id: Set(tenant_id),
        code: Set(input.code.clone()),
        name: Set(input.name.trim().to_string()),
        account_type: Set(account_type.as_str().to_string()),
        is_analytical: Set(input.is_analytical),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    };
    Ok(account.insert(conn).await?)
}

/// Whether a code is taken for the tenant.
pub async fn code_exists<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    code: &str,
) -> Result<bool, DbErr> {
    let count = chart_of_accounts::Entity::find()
        .filter(chart_of_accounts::Column::TenantId.eq(tenant_id))
        .filter(chart_of_accounts::Column::Code.eq(code))
        .count(conn)
        .await?;
    Ok(count > 0)
}

/// Inserts the standard chart accounts the tenant does not have yet.
/// Returns how many were created.
pub async fn seed_standard_chart<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    chart: &ChartCodes,
) -> Result<usize, AccountError> {
    let existing: HashSet<String> = chart_of_accounts::Entity::find()
        .filter(chart_of_accounts::Column::TenantId.eq(tenant_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|a| a.code)
        .collect();

    let mut created = 0;
    for account in standard_chart(chart) {
        if existing.contains(&account.code) {
            continue;
        }
        insert_account(
            conn,
            tenant_id,
            &CreateAccountInput {
                code: account.code,
                name: account.name,
                is_analytical: account.is_analytical,
            },
        )
        .await?;
        created += 1;
    }
    Ok(created)
}

/// Repository for chart of accounts operations.
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an account.
    pub async fn create_account(
        &self,
        tenant_id: Uuid,
        input: &CreateAccountInput,
    ) -> Result<chart_of_accounts::Model, AccountError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let account = insert_account(rls.transaction(), tenant_id, input).await?;
        rls.commit().await?;
        Ok(account)
    }

    /// Lists accounts ordered by code.
    pub async fn list_accounts(
        &self,
        tenant_id: Uuid,
        filter: &AccountFilter,
    ) -> Result<Vec<chart_of_accounts::Model>, DbErr> {
        let mut query = chart_of_accounts::Entity::find()
            .filter(chart_of_accounts::Column::TenantId.eq(tenant_id));
        if filter.analytical_only {
            query = query.filter(chart_of_accounts::Column::IsAnalytical.eq(true));
        }
        if !filter.include_inactive {
            query = query.filter(chart_of_accounts::Column::IsActive.eq(true));
        }
        query
            .order_by_asc(chart_of_accounts::Column::Code)
            .all(&self.db)
            .await
    }

    /// The postable accounts, as offered to the classification advisor.
    pub async fn chart_for_advisor(&self, tenant_id: Uuid) -> Result<Vec<ChartAccount>, DbErr> {
        let accounts = self
            .list_accounts(
                tenant_id,
                &AccountFilter {
                    analytical_only: true,
                    include_inactive: false,
                },
            )
            .await?;
        Ok(accounts
            .into_iter()
            .map(|a| ChartAccount {
                code: a.code,
                name: a.name,
            })
            .collect())
    }

    /// Seeds the standard chart for a tenant.
    pub async fn seed_standard_chart(
        &self,
        tenant_id: Uuid,
        chart: &ChartCodes,
    ) -> Result<usize, AccountError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let created = seed_standard_chart(rls.transaction(), tenant_id, chart).await?;
        rls.commit().await?;
        Ok(created)
    }
}
