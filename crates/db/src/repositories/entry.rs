//! Accounting entry repository.
//!
//! All postings go through [`post_entry`], which validates the draft,
//! refuses closed months and unknown accounts, and writes the header and
//! its lines on the caller's connection so other repositories can post as
//! part of their own transaction.

use std::collections::{BTreeSet, HashMap};

use chrono::{NaiveDate, Utc};
use contta_core::closing::ClosingStatus;
use contta_core::ledger::{EntryDraft, LedgerError, ensure_period_open};
use contta_shared::types::FiscalMonth;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::entities::{
    accounting_entries, accounting_entry_lines, chart_of_accounts, monthly_closings,
};
use crate::rls::RlsConnection;

/// Error types for entry operations.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    /// Draft rejected by ledger rules (unbalanced, closed month...).
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Line refers to an account that does not exist or is not analytical.
    #[error("Unknown or synthetic account: {0}")]
    UnknownAccount(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// An entry with its lines in line order.
#[derive(Debug, Clone)]
pub struct EntryWithLines {
    /// Header.
    pub entry: accounting_entries::Model,
    /// Lines.
    pub lines: Vec<accounting_entry_lines::Model>,
}

/// Message raised by the `trg_refuse_closed_period` trigger.
pub(crate) const CLOSED_PERIOD_RAISE: &str = "Cannot post to closed period";

/// Closing status of a month, `None` when it was never evaluated.
///
/// The closing row is read `FOR SHARE`: a sign-off of the same month waits
/// for the caller's transaction, and the caller waits for a sign-off
/// already in progress.
pub async fn period_status<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    period: FiscalMonth,
) -> Result<Option<ClosingStatus>, DbErr> {
    let row = monthly_closings::Entity::find()
        .filter(monthly_closings::Column::TenantId.eq(tenant_id))
        .filter(monthly_closings::Column::Period.eq(period.to_string()))
        .lock_shared()
        .one(conn)
        .await?;
    Ok(row.and_then(|r| r.status.parse().ok()))
}

fn insert_error(err: DbErr, period: FiscalMonth) -> EntryError {
    if err.to_string().contains(CLOSED_PERIOD_RAISE) {
        LedgerError::PeriodClosed(period).into()
    } else {
        err.into()
    }
}

/// Validates and writes an entry. Returns the new entry id.
pub async fn post_entry<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    draft: &EntryDraft,
    created_by: Option<Uuid>,
) -> Result<Uuid, EntryError> {
    draft.validate()?;
    ensure_period_open(draft.period(), period_status(conn, tenant_id, draft.period()).await?)?;
    ensure_accounts_exist(conn, tenant_id, draft).await?;

    let entry_id = Uuid::now_v7();
    accounting_entries::ActiveModel {
        id: Set(entry_id),
        tenant_id: Set(tenant_id),
        entry_date: Set(draft.date),
        description: Set(draft.description.clone()),
        entry_type: Set(draft.entry_type.as_str().to_string()),
        reference_type: Set(draft.reference_type.clone()),
        reference_id: Set(draft.reference_id),
        created_by: Set(created_by),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await
    .map_err(|e| insert_error(e, draft.period()))?;

    let lines = draft.lines.iter().zip(1..).map(|(line, number)| {
        accounting_entry_lines::ActiveModel {
            id: Set(Uuid::now_v7()),
            tenant_id: Set(tenant_id),
            entry_id: Set(entry_id),
            line_number: Set(number),
            account_code: Set(line.account_code.clone()),
            debit: Set(line.debit),
            credit: Set(line.credit),
            memo: Set(line.memo.clone()),
        }
    });
    accounting_entry_lines::Entity::insert_many(lines)
        .exec(conn)
        .await?;

    tracing::debug!(
        tenant_id = %tenant_id,
        entry_id = %entry_id,
        entry_type = draft.entry_type.as_str(),
        "Entry posted"
    );
    Ok(entry_id)
}

async fn ensure_accounts_exist<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    draft: &EntryDraft,
) -> Result<(), EntryError> {
    let codes: BTreeSet<&str> = draft.lines.iter().map(|l| l.account_code.as_str()).collect();
    let known: BTreeSet<String> = chart_of_accounts::Entity::find()
        .filter(chart_of_accounts::Column::TenantId.eq(tenant_id))
        .filter(chart_of_accounts::Column::Code.is_in(codes.iter().copied()))
        .filter(chart_of_accounts::Column::IsActive.eq(true))
        .filter(chart_of_accounts::Column::IsAnalytical.eq(true))
        .all(conn)
        .await?
        .into_iter()
        .map(|a| a.code)
        .collect();

    match codes.into_iter().find(|code| !known.contains(*code)) {
        Some(missing) => Err(EntryError::UnknownAccount(missing.to_string())),
        None => Ok(()),
    }
}

/// Repository for manual entries and entry listings.
pub struct EntryRepository {
    db: DatabaseConnection,
}

impl EntryRepository {
    /// Creates a new entry repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Posts a draft in its own tenant transaction.
    pub async fn post(
        &self,
        tenant_id: Uuid,
        draft: &EntryDraft,
        created_by: Uuid,
    ) -> Result<Uuid, EntryError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let id = post_entry(rls.transaction(), tenant_id, draft, Some(created_by)).await?;
        rls.commit().await?;
        Ok(id)
    }

    /// Lists entries dated within `[from, to]`, oldest first.
    pub async fn list(
        &self,
        tenant_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<EntryWithLines>, DbErr> {
        let mut query = accounting_entries::Entity::find()
            .filter(accounting_entries::Column::TenantId.eq(tenant_id));
        if let Some(from) = from {
            query = query.filter(accounting_entries::Column::EntryDate.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(accounting_entries::Column::EntryDate.lte(to));
        }
        let entries = query
            .order_by_asc(accounting_entries::Column::EntryDate)
            .order_by_asc(accounting_entries::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let ids: Vec<Uuid> = entries.iter().map(|e| e.id).collect();
        let mut by_entry: HashMap<Uuid, Vec<accounting_entry_lines::Model>> = HashMap::new();
        for line in accounting_entry_lines::Entity::find()
            .filter(accounting_entry_lines::Column::EntryId.is_in(ids))
            .order_by_asc(accounting_entry_lines::Column::LineNumber)
            .all(&self.db)
            .await?
        {
            by_entry.entry(line.entry_id).or_default().push(line);
        }

        Ok(entries
            .into_iter()
            .map(|entry| EntryWithLines {
                lines: by_entry.remove(&entry.id).unwrap_or_default(),
                entry,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn january() -> FiscalMonth {
        "2025-01".parse().unwrap()
    }

    #[test]
    fn test_trigger_refusal_maps_to_period_closed() {
        let err = DbErr::Custom(format!(
            "error returned from database: {CLOSED_PERIOD_RAISE} 2025-01"
        ));
        assert!(matches!(
            insert_error(err, january()),
            EntryError::Ledger(LedgerError::PeriodClosed(p)) if p == january()
        ));
    }

    #[test]
    fn test_other_insert_errors_stay_database_errors() {
        let err = DbErr::Custom("duplicate key value violates unique constraint".to_string());
        assert!(matches!(insert_error(err, january()), EntryError::Database(_)));
    }
}
