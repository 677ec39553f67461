//! Month-end closing repository.
//!
//! Gathers the facts a closing is evaluated from (integrity checks and
//! transitory balances) and stores the evaluation, sign-off and reopening
//! of each month.

use chrono::{NaiveDate, Utc};
use contta_core::closing::{
    ClosingError, ClosingEvaluation, ClosingInput, ClosingStatus, IntegrityCheck,
    IntegrityReport, StoredEvaluation, TransitoryBalance, checks, ensure_can_evaluate,
    ensure_can_reopen, ensure_can_sign_off,
};
use contta_core::ledger::ChartCodes;
use contta_shared::types::FiscalMonth;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr,
    EntityTrait, FromQueryResult, IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set,
    Statement,
};
use uuid::Uuid;

use crate::entities::{chart_of_accounts, monthly_closings};
use crate::rls::RlsConnection;

/// Error types for closing operations.
#[derive(Debug, thiserror::Error)]
pub enum ClosingRepoError {
    /// Month was never evaluated.
    #[error("No closing record for {0}")]
    NotFound(FiscalMonth),

    /// Lifecycle rule violated (closed, blocked, stale...).
    #[error(transparent)]
    Closing(#[from] ClosingError),

    /// Stored row could not be decoded.
    #[error("Corrupt closing record: {0}")]
    Corrupt(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

const UNBALANCED_ENTRIES_SQL: &str = r"
SELECT COUNT(*)::BIGINT AS violations FROM (
    SELECT e.id
    FROM accounting_entries e
    LEFT JOIN accounting_entry_lines l ON l.entry_id = e.id
    WHERE e.tenant_id = $1 AND e.entry_date BETWEEN $2 AND $3
    GROUP BY e.id
    HAVING COALESCE(SUM(l.debit), 0) <> COALESCE(SUM(l.credit), 0)
) unbalanced
";

const CLASSIFIED_NOT_RECONCILED_SQL: &str = r"
SELECT COUNT(*)::BIGINT AS violations
FROM bank_transactions
WHERE tenant_id = $1 AND transaction_date BETWEEN $2 AND $3
  AND journal_entry_id IS NOT NULL AND status <> 'reconciled'
";

const RECONCILED_WITHOUT_TIMESTAMP_SQL: &str = r"
SELECT COUNT(*)::BIGINT AS violations
FROM bank_transactions
WHERE tenant_id = $1 AND transaction_date BETWEEN $2 AND $3
  AND status = 'reconciled' AND reconciled_at IS NULL
";

const PENDING_CLASSIFICATION_SQL: &str = r"
SELECT COUNT(*)::BIGINT AS violations
FROM bank_transactions
WHERE tenant_id = $1 AND transaction_date BETWEEN $2 AND $3
  AND status = 'pending'
";

const ACCOUNT_BALANCE_SQL: &str = r"
SELECT COALESCE(SUM(l.debit - l.credit), 0) AS balance
FROM accounting_entry_lines l
JOIN accounting_entries e ON e.id = l.entry_id
WHERE e.tenant_id = $1 AND l.account_code = $2 AND e.entry_date <= $3
";

/// The four checks and their descriptions, in report order.
const INTEGRITY_CHECKS: [(&str, &str, &str); 4] = [
    (
        checks::UNBALANCED_ENTRIES,
        "Entries whose debits differ from credits",
        UNBALANCED_ENTRIES_SQL,
    ),
    (
        checks::CLASSIFIED_NOT_RECONCILED,
        "Bank transactions with an entry but not reconciled",
        CLASSIFIED_NOT_RECONCILED_SQL,
    ),
    (
        checks::RECONCILED_WITHOUT_TIMESTAMP,
        "Reconciled bank transactions without reconciliation time",
        RECONCILED_WITHOUT_TIMESTAMP_SQL,
    ),
    (
        checks::PENDING_CLASSIFICATION,
        "Bank transactions still pending classification",
        PENDING_CLASSIFICATION_SQL,
    ),
];

#[derive(Debug, FromQueryResult)]
struct ViolationsRow {
    violations: i64,
}

#[derive(Debug, FromQueryResult)]
struct BalanceRow {
    balance: Decimal,
}

/// Repository for monthly closings.
pub struct ClosingRepository {
    db: DatabaseConnection,
}

impl ClosingRepository {
    /// Creates a new closing repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Runs the integrity checks over the records of a month.
    pub async fn integrity_report<C: ConnectionTrait>(
        conn: &C,
        tenant_id: Uuid,
        period: FiscalMonth,
    ) -> Result<IntegrityReport, DbErr> {
        let mut results = Vec::with_capacity(INTEGRITY_CHECKS.len());
        for (code, description, sql) in INTEGRITY_CHECKS {
            let row = ViolationsRow::find_by_statement(Statement::from_sql_and_values(
                DbBackend::Postgres,
                sql,
                [
                    tenant_id.into(),
                    period.first_day().into(),
                    period.last_day().into(),
                ],
            ))
            .one(conn)
            .await?;
            let violations = row.map_or(0, |r| u64::try_from(r.violations).unwrap_or(0));
            results.push(IntegrityCheck::new(code, description, violations));
        }
        Ok(IntegrityReport::from_checks(results))
    }

    /// Cumulative balance (debits minus credits) of each transitory account
    /// up to the last day of the month.
    pub async fn transitory_balances<C: ConnectionTrait>(
        conn: &C,
        tenant_id: Uuid,
        period: FiscalMonth,
        chart: &ChartCodes,
    ) -> Result<Vec<TransitoryBalance>, DbErr> {
        let mut balances = Vec::new();
        for code in chart.transitory_accounts() {
            let balance = account_balance(conn, tenant_id, code, period.last_day()).await?;
            let account_name = chart_of_accounts::Entity::find()
                .filter(chart_of_accounts::Column::TenantId.eq(tenant_id))
                .filter(chart_of_accounts::Column::Code.eq(code))
                .one(conn)
                .await?
                .map_or_else(|| code.to_string(), |a| a.name);
            balances.push(TransitoryBalance {
                account_code: code.to_string(),
                account_name,
                balance,
            });
        }
        Ok(balances)
    }

    /// Collects everything a month is evaluated from.
    pub async fn gather_input<C: ConnectionTrait>(
        conn: &C,
        tenant_id: Uuid,
        period: FiscalMonth,
        chart: &ChartCodes,
    ) -> Result<ClosingInput, DbErr> {
        Ok(ClosingInput {
            tenant_id,
            period,
            integrity: Self::integrity_report(conn, tenant_id, period).await?,
            transitory_balances: Self::transitory_balances(conn, tenant_id, period, chart).await?,
        })
    }

    /// Evaluates a month and stores the result.
    ///
    /// The evaluation is returned even when blocked; only a closed month is
    /// refused.
    pub async fn evaluate(
        &self,
        tenant_id: Uuid,
        period: FiscalMonth,
        chart: &ChartCodes,
        user_id: Uuid,
    ) -> Result<ClosingEvaluation, ClosingRepoError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let txn = rls.transaction();

        let existing = lock_row(txn, tenant_id, period).await?;
        ensure_can_evaluate(period, existing.as_ref().and_then(|r| r.status.parse().ok()))?;

        let input = Self::gather_input(txn, tenant_id, period, chart).await?;
        let evaluation = contta_core::closing::evaluate_closing(&input);
        let must_fix = serde_json::to_value(&evaluation.must_fix)
            .map_err(|e| ClosingRepoError::Corrupt(e.to_string()))?;
        let now = Utc::now().into();

        if let Some(row) = existing {
            let mut row = row.into_active_model();
            row.status = Set(evaluation.decision.resulting_status().as_str().to_string());
            row.decision = Set(Some(evaluation.decision.as_str().to_string()));
            row.must_fix = Set(must_fix);
            row.input_hash = Set(Some(evaluation.input_hash.clone()));
            row.evaluated_at = Set(Some(now));
            row.evaluated_by = Set(Some(user_id));
            row.updated_at = Set(now);
            row.update(txn).await?;
        } else {
            monthly_closings::ActiveModel {
                id: Set(Uuid::now_v7()),
                tenant_id: Set(tenant_id),
                period: Set(period.to_string()),
                status: Set(evaluation.decision.resulting_status().as_str().to_string()),
                decision: Set(Some(evaluation.decision.as_str().to_string())),
                must_fix: Set(must_fix),
                input_hash: Set(Some(evaluation.input_hash.clone())),
                evaluated_at: Set(Some(now)),
                evaluated_by: Set(Some(user_id)),
                closed_at: Set(None),
                closed_by: Set(None),
                reopened_at: Set(None),
                reopened_by: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(txn)
            .await?;
        }

        rls.commit().await?;
        tracing::info!(
            tenant_id = %tenant_id,
            period = %period,
            decision = evaluation.decision.as_str(),
            must_fix = evaluation.must_fix.len(),
            "Closing evaluated"
        );
        Ok(evaluation)
    }

    /// Closes an authorized month whose facts did not change since evaluation.
    pub async fn sign_off(
        &self,
        tenant_id: Uuid,
        period: FiscalMonth,
        chart: &ChartCodes,
        user_id: Uuid,
    ) -> Result<monthly_closings::Model, ClosingRepoError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let txn = rls.transaction();

        let row = lock_row(txn, tenant_id, period).await?;
        let input = Self::gather_input(txn, tenant_id, period, chart).await?;
        let fresh_hash = contta_core::closing::closing_input_hash(&input);

        let stored = row.as_ref().map(stored_evaluation).transpose()?;
        ensure_can_sign_off(period, stored, &fresh_hash)?;
        let Some(row) = row else {
            return Err(ClosingRepoError::NotFound(period));
        };

        let now = Utc::now().into();
        let mut active = row.into_active_model();
        active.status = Set(ClosingStatus::Closed.as_str().to_string());
        active.closed_at = Set(Some(now));
        active.closed_by = Set(Some(user_id));
        active.updated_at = Set(now);
        let updated = active.update(txn).await?;

        rls.commit().await?;
        tracing::info!(tenant_id = %tenant_id, period = %period, "Month closed");
        Ok(updated)
    }

    /// Reopens a closed month. It must be evaluated again before closing.
    pub async fn reopen(
        &self,
        tenant_id: Uuid,
        period: FiscalMonth,
        user_id: Uuid,
    ) -> Result<monthly_closings::Model, ClosingRepoError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let txn = rls.transaction();

        let row = lock_row(txn, tenant_id, period).await?;
        ensure_can_reopen(period, row.as_ref().and_then(|r| r.status.parse().ok()))?;
        let Some(row) = row else {
            return Err(ClosingRepoError::NotFound(period));
        };

        let now = Utc::now().into();
        let mut active = row.into_active_model();
        active.status = Set(ClosingStatus::Reopened.as_str().to_string());
        active.reopened_at = Set(Some(now));
        active.reopened_by = Set(Some(user_id));
        active.updated_at = Set(now);
        let updated = active.update(txn).await?;

        rls.commit().await?;
        tracing::warn!(tenant_id = %tenant_id, period = %period, "Month reopened");
        Ok(updated)
    }

    /// The closing row of a month.
    pub async fn find(
        &self,
        tenant_id: Uuid,
        period: FiscalMonth,
    ) -> Result<monthly_closings::Model, ClosingRepoError> {
        find_row(&self.db, tenant_id, period)
            .await?
            .ok_or(ClosingRepoError::NotFound(period))
    }

    /// All closing rows, newest period first.
    pub async fn list(&self, tenant_id: Uuid) -> Result<Vec<monthly_closings::Model>, DbErr> {
        monthly_closings::Entity::find()
            .filter(monthly_closings::Column::TenantId.eq(tenant_id))
            .order_by_desc(monthly_closings::Column::Period)
            .all(&self.db)
            .await
    }
}

async fn find_row<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    period: FiscalMonth,
) -> Result<Option<monthly_closings::Model>, DbErr> {
    monthly_closings::Entity::find()
        .filter(monthly_closings::Column::TenantId.eq(tenant_id))
        .filter(monthly_closings::Column::Period.eq(period.to_string()))
        .one(conn)
        .await
}

/// Locks the closing row of a month `FOR UPDATE`. Postings into the month
/// hold it `FOR SHARE`, so the facts read after this call are final until
/// commit.
async fn lock_row<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    period: FiscalMonth,
) -> Result<Option<monthly_closings::Model>, DbErr> {
    monthly_closings::Entity::find()
        .filter(monthly_closings::Column::TenantId.eq(tenant_id))
        .filter(monthly_closings::Column::Period.eq(period.to_string()))
        .lock_exclusive()
        .one(conn)
        .await
}

async fn account_balance<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    account_code: &str,
    up_to: NaiveDate,
) -> Result<Decimal, DbErr> {
    let row = BalanceRow::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        ACCOUNT_BALANCE_SQL,
        [tenant_id.into(), account_code.into(), up_to.into()],
    ))
    .one(conn)
    .await?;
    Ok(row.map_or(Decimal::ZERO, |r| r.balance))
}

fn stored_evaluation(
    row: &monthly_closings::Model,
) -> Result<StoredEvaluation<'_>, ClosingRepoError> {
    let status = row
        .status
        .parse()
        .map_err(ClosingRepoError::Corrupt)?;
    let decision = row
        .decision
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(ClosingRepoError::Corrupt)?;
    Ok(StoredEvaluation {
        status,
        decision,
        input_hash: row.input_hash.as_deref().map(str::trim),
    })
}
