//! Report repository: debit and credit sums per account over the ledger.
//!
//! Each report reads inside one repeatable-read, read-only transaction
//! scoped to the tenant, so the opening balances and the movement of a
//! trial balance come from the same snapshot.

use std::collections::HashMap;

use chrono::NaiveDate;
use contta_core::reports::{
    AccountLedgerReport, BalanceSheetReport, ChartRow, IncomeStatementReport, Movement,
    PostedLine, ReportError, ReportService, TrialBalanceReport, ensure_range,
};
use contta_shared::types::FiscalMonth;
use rust_decimal::Decimal;
use sea_orm::{
    AccessMode, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend,
    DbErr, EntityTrait, FromQueryResult, IsolationLevel, QueryFilter, QueryOrder, Statement,
    TransactionTrait, Value,
};
use uuid::Uuid;

use crate::entities::chart_of_accounts;
use crate::rls::set_rls_context;

/// Error types for report operations.
#[derive(Debug, thiserror::Error)]
pub enum ReportRepoError {
    /// Report rule violated (unknown account, inverted range).
    #[error(transparent)]
    Report(#[from] ReportError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

const MOVEMENT_BETWEEN_SQL: &str = r"
SELECT l.account_code,
       COALESCE(SUM(l.debit), 0) AS debit,
       COALESCE(SUM(l.credit), 0) AS credit
FROM accounting_entry_lines l
JOIN accounting_entries e ON e.id = l.entry_id
WHERE e.tenant_id = $1 AND e.entry_date BETWEEN $2 AND $3
GROUP BY l.account_code
";

const MOVEMENT_BEFORE_SQL: &str = r"
SELECT l.account_code,
       COALESCE(SUM(l.debit), 0) AS debit,
       COALESCE(SUM(l.credit), 0) AS credit
FROM accounting_entry_lines l
JOIN accounting_entries e ON e.id = l.entry_id
WHERE e.tenant_id = $1 AND e.entry_date < $2
GROUP BY l.account_code
";

const MOVEMENT_UP_TO_SQL: &str = r"
SELECT l.account_code,
       COALESCE(SUM(l.debit), 0) AS debit,
       COALESCE(SUM(l.credit), 0) AS credit
FROM accounting_entry_lines l
JOIN accounting_entries e ON e.id = l.entry_id
WHERE e.tenant_id = $1 AND e.entry_date <= $2
GROUP BY l.account_code
";

// An account and everything below it.
const ACCOUNT_OPENING_SQL: &str = r"
SELECT COALESCE(SUM(l.debit), 0) AS debit,
       COALESCE(SUM(l.credit), 0) AS credit
FROM accounting_entry_lines l
JOIN accounting_entries e ON e.id = l.entry_id
WHERE e.tenant_id = $1
  AND (l.account_code = $2 OR l.account_code LIKE ($2 || '.%'))
  AND e.entry_date < $3
";

const ACCOUNT_LINES_SQL: &str = r"
SELECT e.id AS entry_id, e.entry_date, e.description, l.memo, l.debit, l.credit
FROM accounting_entry_lines l
JOIN accounting_entries e ON e.id = l.entry_id
WHERE e.tenant_id = $1
  AND (l.account_code = $2 OR l.account_code LIKE ($2 || '.%'))
  AND e.entry_date BETWEEN $3 AND $4
ORDER BY e.entry_date, e.created_at, e.id, l.line_number
";

#[derive(Debug, FromQueryResult)]
struct AccountMovementRow {
    account_code: String,
    debit: Decimal,
    credit: Decimal,
}

#[derive(Debug, FromQueryResult)]
struct MovementRow {
    debit: Decimal,
    credit: Decimal,
}

#[derive(Debug, FromQueryResult)]
struct LedgerRow {
    entry_id: Uuid,
    entry_date: NaiveDate,
    description: String,
    memo: Option<String>,
    debit: Decimal,
    credit: Decimal,
}

impl From<LedgerRow> for PostedLine {
    fn from(row: LedgerRow) -> Self {
        Self {
            entry_id: row.entry_id,
            entry_date: row.entry_date,
            description: row.description,
            memo: row.memo,
            debit: row.debit,
            credit: row.credit,
        }
    }
}

/// Repository for accounting reports.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    db: DatabaseConnection,
}

impl ReportRepository {
    /// Creates a new report repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Trial balance of a month: balances before its first day and the
    /// movement inside it.
    pub async fn trial_balance(
        &self,
        tenant_id: Uuid,
        period: FiscalMonth,
    ) -> Result<TrialBalanceReport, DbErr> {
        let txn = self.snapshot(tenant_id).await?;
        let chart = chart_rows(&txn, tenant_id).await?;
        let opening = movements(
            &txn,
            MOVEMENT_BEFORE_SQL,
            [tenant_id.into(), period.first_day().into()],
        )
        .await?;
        let movement = movements(
            &txn,
            MOVEMENT_BETWEEN_SQL,
            [
                tenant_id.into(),
                period.first_day().into(),
                period.last_day().into(),
            ],
        )
        .await?;
        txn.commit().await?;

        let report = ReportService::generate_trial_balance(period, &chart, &opening, &movement);
        tracing::debug!(
            tenant_id = %tenant_id,
            period = %period,
            accounts = report.accounts.len(),
            balanced = report.totals.is_balanced,
            "Trial balance generated"
        );
        Ok(report)
    }

    /// Income statement of `[from, to]`.
    pub async fn income_statement(
        &self,
        tenant_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<IncomeStatementReport, ReportRepoError> {
        ensure_range(from, to)?;
        let txn = self.snapshot(tenant_id).await?;
        let chart = chart_rows(&txn, tenant_id).await?;
        let movement = movements(
            &txn,
            MOVEMENT_BETWEEN_SQL,
            [tenant_id.into(), from.into(), to.into()],
        )
        .await?;
        txn.commit().await?;

        Ok(ReportService::generate_income_statement(
            from, to, &chart, &movement,
        )?)
    }

    /// Balance sheet with every entry dated up to `as_of`.
    pub async fn balance_sheet(
        &self,
        tenant_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<BalanceSheetReport, DbErr> {
        let txn = self.snapshot(tenant_id).await?;
        let chart = chart_rows(&txn, tenant_id).await?;
        let cumulative = movements(
            &txn,
            MOVEMENT_UP_TO_SQL,
            [tenant_id.into(), as_of.into()],
        )
        .await?;
        txn.commit().await?;

        let report = ReportService::generate_balance_sheet(as_of, &chart, &cumulative);
        if !report.is_balanced {
            tracing::warn!(
                tenant_id = %tenant_id,
                as_of = %as_of,
                total_assets = %report.total_assets,
                liabilities_and_equity = %report.liabilities_and_equity,
                "Balance sheet does not balance"
            );
        }
        Ok(report)
    }

    /// Ledger of an account over `[from, to]`. A synthetic account shows the
    /// lines of every account below it.
    pub async fn account_ledger(
        &self,
        tenant_id: Uuid,
        account_code: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<AccountLedgerReport, ReportRepoError> {
        ensure_range(from, to)?;
        let txn = self.snapshot(tenant_id).await?;

        let account = chart_of_accounts::Entity::find()
            .filter(chart_of_accounts::Column::TenantId.eq(tenant_id))
            .filter(chart_of_accounts::Column::Code.eq(account_code))
            .one(&txn)
            .await?
            .ok_or_else(|| ReportError::AccountNotFound(account_code.to_string()))?;

        let opening = MovementRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            ACCOUNT_OPENING_SQL,
            [tenant_id.into(), account_code.into(), from.into()],
        ))
        .one(&txn)
        .await?
        .map_or_else(Movement::default, |r| Movement::new(r.debit, r.credit));

        let lines = LedgerRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            ACCOUNT_LINES_SQL,
            [tenant_id.into(), account_code.into(), from.into(), to.into()],
        ))
        .all(&txn)
        .await?;
        txn.commit().await?;

        let row = ChartRow {
            code: account.code,
            name: account.name,
            is_analytical: account.is_analytical,
        };
        Ok(ReportService::generate_account_ledger(
            &row,
            from,
            to,
            opening,
            lines.into_iter().map(PostedLine::from).collect(),
        )?)
    }

    async fn snapshot(&self, tenant_id: Uuid) -> Result<DatabaseTransaction, DbErr> {
        let txn = self
            .db
            .begin_with_config(
                Some(IsolationLevel::RepeatableRead),
                Some(AccessMode::ReadOnly),
            )
            .await?;
        set_rls_context(&txn, tenant_id).await?;
        Ok(txn)
    }
}

/// Active chart accounts of a tenant.
pub async fn chart_rows<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
) -> Result<Vec<ChartRow>, DbErr> {
    Ok(chart_of_accounts::Entity::find()
        .filter(chart_of_accounts::Column::TenantId.eq(tenant_id))
        .filter(chart_of_accounts::Column::IsActive.eq(true))
        .order_by_asc(chart_of_accounts::Column::Code)
        .all(conn)
        .await?
        .into_iter()
        .map(|a| ChartRow {
            code: a.code,
            name: a.name,
            is_analytical: a.is_analytical,
        })
        .collect())
}

async fn movements<C, const N: usize>(
    conn: &C,
    sql: &str,
    values: [Value; N],
) -> Result<HashMap<String, Movement>, DbErr>
where
    C: ConnectionTrait,
{
    Ok(AccountMovementRow::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        sql,
        values,
    ))
    .all(conn)
    .await?
    .into_iter()
    .map(|r| (r.account_code, Movement::new(r.debit, r.credit)))
    .collect())
}
