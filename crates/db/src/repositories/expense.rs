//! Expense repository.
//!
//! Expenses are payables. Creating one posts its provision against the
//! payable derived from the expense account; paying it posts the bank
//! outflow.

use chrono::{NaiveDate, Utc};
use contta_core::billing::{BillingError, ExpenseStatus};
use contta_core::ledger::{ChartCodes, expense_payment, expense_provision};
use contta_core::reconciliation::ExpenseCandidate;
use contta_shared::types::PageRequest;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::entry::{EntryError, post_entry};
use crate::entities::expenses;
use crate::rls::RlsConnection;

/// Error types for expense operations.
#[derive(Debug, thiserror::Error)]
pub enum ExpenseRepoError {
    /// Expense not found.
    #[error("Expense not found: {0}")]
    NotFound(Uuid),

    /// Status does not allow the operation.
    #[error(transparent)]
    Billing(#[from] BillingError),

    /// Provision or payment could not be posted.
    #[error(transparent)]
    Entry(#[from] EntryError),

    /// Stored status could not be decoded.
    #[error("Corrupt expense record: {0}")]
    Corrupt(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for registering an expense.
#[derive(Debug, Clone)]
pub struct CreateExpenseInput {
    /// Description.
    pub description: String,
    /// Free-form category, matched by expense rules.
    pub category: Option<String>,
    /// Expense account debited by the provision.
    pub account_code: String,
    /// Amount.
    pub amount: Decimal,
    /// Due date; the provision is dated on it.
    pub due_date: NaiveDate,
}

/// Filter for listing expenses.
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    /// Status.
    pub status: Option<ExpenseStatus>,
    /// Due on or after.
    pub from: Option<NaiveDate>,
    /// Due on or before.
    pub to: Option<NaiveDate>,
}

/// Decodes the status column.
pub fn expense_status(row: &expenses::Model) -> Result<ExpenseStatus, ExpenseRepoError> {
    row.status.parse().map_err(ExpenseRepoError::Corrupt)
}

/// Finds an expense of the tenant on the caller's connection.
pub async fn find_expense<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<expenses::Model, ExpenseRepoError> {
    expenses::Entity::find_by_id(id)
        .filter(expenses::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .ok_or(ExpenseRepoError::NotFound(id))
}

/// Posts the payment of an expense and marks it paid.
pub async fn pay_expense<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    expense: expenses::Model,
    paid_at: NaiveDate,
    chart: &ChartCodes,
    user_id: Uuid,
) -> Result<expenses::Model, ExpenseRepoError> {
    expense_status(&expense)?.ensure_payable()?;
    let draft = expense_payment(
        chart,
        &expense.account_code,
        expense.amount,
        paid_at,
        &format!("Pagamento - {}", expense.description),
        expense.id,
    )
    .map_err(EntryError::from)?;
    let entry_id = post_entry(conn, tenant_id, &draft, Some(user_id)).await?;

    let mut active = expense.into_active_model();
    active.status = Set(ExpenseStatus::Paid.as_str().to_string());
    active.paid_at = Set(Some(paid_at));
    active.payment_entry_id = Set(Some(entry_id));
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(conn).await?)
}

/// Repository for expense operations.
pub struct ExpenseRepository {
    db: DatabaseConnection,
}

impl ExpenseRepository {
    /// Creates a new expense repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Registers an expense and posts its provision.
    pub async fn create(
        &self,
        tenant_id: Uuid,
        input: &CreateExpenseInput,
        chart: &ChartCodes,
        user_id: Uuid,
    ) -> Result<expenses::Model, ExpenseRepoError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let txn = rls.transaction();

        let now = Utc::now().into();
        let expense = expenses::ActiveModel {
            id: Set(Uuid::now_v7()),
            tenant_id: Set(tenant_id),
            description: Set(input.description.trim().to_string()),
            category: Set(input.category.clone()),
            account_code: Set(input.account_code.clone()),
            amount: Set(input.amount),
            due_date: Set(input.due_date),
            status: Set(ExpenseStatus::Pending.as_str().to_string()),
            paid_at: Set(None),
            provision_entry_id: Set(None),
            payment_entry_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await?;

        let draft = expense_provision(
            chart,
            &input.account_code,
            input.amount,
            input.due_date,
            &expense.description,
            expense.id,
        )
        .map_err(EntryError::from)?;
        let entry_id = post_entry(txn, tenant_id, &draft, Some(user_id)).await?;

        let mut active = expense.into_active_model();
        active.provision_entry_id = Set(Some(entry_id));
        let expense = active.update(txn).await?;

        rls.commit().await?;
        tracing::info!(tenant_id = %tenant_id, expense_id = %expense.id, "Expense registered");
        Ok(expense)
    }

    /// Finds an expense by id.
    pub async fn find(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<expenses::Model, ExpenseRepoError> {
        find_expense(&self.db, tenant_id, id).await
    }

    /// Lists expenses by due date. Returns the page and the total count.
    pub async fn list(
        &self,
        tenant_id: Uuid,
        filter: &ExpenseFilter,
        page: &PageRequest,
    ) -> Result<(Vec<expenses::Model>, u64), DbErr> {
        let mut query = expenses::Entity::find().filter(expenses::Column::TenantId.eq(tenant_id));
        if let Some(status) = filter.status {
            query = query.filter(expenses::Column::Status.eq(status.as_str()));
        }
        if let Some(from) = filter.from {
            query = query.filter(expenses::Column::DueDate.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(expenses::Column::DueDate.lte(to));
        }

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_asc(expenses::Column::DueDate)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok((rows, total))
    }

    /// Pays a pending expense.
    pub async fn pay(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        paid_at: NaiveDate,
        chart: &ChartCodes,
        user_id: Uuid,
    ) -> Result<expenses::Model, ExpenseRepoError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let txn = rls.transaction();
        let expense = find_expense(txn, tenant_id, id).await?;
        let expense = pay_expense(txn, tenant_id, expense, paid_at, chart, user_id).await?;
        rls.commit().await?;
        tracing::info!(tenant_id = %tenant_id, expense_id = %id, "Expense paid");
        Ok(expense)
    }

    /// Pending expenses offered to the reconciliation rules.
    pub async fn candidates(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<ExpenseCandidate>, ExpenseRepoError> {
        expenses::Entity::find()
            .filter(expenses::Column::TenantId.eq(tenant_id))
            .filter(expenses::Column::Status.eq(ExpenseStatus::Pending.as_str()))
            .all(&self.db)
            .await?
            .iter()
            .map(|row| {
                Ok(ExpenseCandidate {
                    expense_id: row.id,
                    category: row.category.clone(),
                    amount: row.amount,
                    status: expense_status(row)?,
                })
            })
            .collect()
    }
}
