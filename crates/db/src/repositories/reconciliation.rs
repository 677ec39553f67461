//! Reconciliation queue and rule repository.

use chrono::Utc;
use contta_core::ledger::ChartCodes;
use contta_core::reconciliation::{
    InvoiceMatch, OfxCnabMatch, PendingStatus, ReconciliationError, ReconciliationRule, RuleType,
    compile_rule_pattern,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::invoice::{InvoiceRepoError, find_invoice, receive_invoice};
use crate::entities::{pending_reconciliations, reconciliation_rules};
use crate::rls::RlsConnection;

/// Error types for reconciliation operations.
#[derive(Debug, thiserror::Error)]
pub enum ReconciliationRepoError {
    /// Pending reconciliation not found.
    #[error("Reconciliation not found: {0}")]
    NotFound(Uuid),

    /// Domain rule violated (already resolved, bad pattern...).
    #[error(transparent)]
    Reconciliation(#[from] ReconciliationError),

    /// The matched invoice could not be received.
    #[error(transparent)]
    Invoice(#[from] InvoiceRepoError),

    /// Stored status could not be decoded.
    #[error("Corrupt reconciliation record: {0}")]
    Corrupt(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// A matched OFX/CNAB pair to queue for approval.
#[derive(Debug, Clone, Copy)]
pub struct NewPending<'a> {
    /// The pair.
    pub pair: &'a OfxCnabMatch,
    /// OFX memo of the credit.
    pub ofx_description: Option<&'a str>,
    /// Invoice the boleto pays, when found.
    pub invoice: Option<&'a InvoiceMatch>,
}

/// Outcome of queueing a report.
#[derive(Debug, Clone, Default)]
pub struct QueuedPairs {
    /// Rows created.
    pub stored: Vec<pending_reconciliations::Model>,
    /// Pairs already queued by an earlier upload.
    pub duplicates: usize,
}

/// Input for creating a rule.
#[derive(Debug, Clone)]
pub struct CreateRuleInput {
    /// Display name.
    pub name: String,
    /// Case-insensitive regex over the description.
    pub pattern: String,
    /// Expense or revenue.
    pub rule_type: RuleType,
    /// Expense category looked for.
    pub target_category: Option<String>,
    /// Acts during import.
    pub auto_match: bool,
    /// Higher runs first.
    pub priority: i32,
}

/// Decodes the status column.
pub fn pending_status(
    row: &pending_reconciliations::Model,
) -> Result<PendingStatus, ReconciliationRepoError> {
    row.status.parse().map_err(ReconciliationRepoError::Corrupt)
}

/// Converts a stored rule. Rows with an unknown type are dropped.
fn to_rule(row: reconciliation_rules::Model) -> Option<ReconciliationRule> {
    let rule_type = row.rule_type.parse().ok()?;
    Some(ReconciliationRule {
        id: row.id,
        name: row.name,
        pattern: row.pattern,
        rule_type,
        target_category: row.target_category,
        auto_match: row.auto_match,
        is_active: row.is_active,
        priority: row.priority,
    })
}

async fn already_queued<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    pair: &OfxCnabMatch,
) -> Result<bool, DbErr> {
    let count = pending_reconciliations::Entity::find()
        .filter(pending_reconciliations::Column::TenantId.eq(tenant_id))
        .filter(pending_reconciliations::Column::CnabReference.eq(pair.cnab_reference.as_str()))
        .filter(pending_reconciliations::Column::CnabDate.eq(pair.cnab_date))
        .filter(pending_reconciliations::Column::CnabAmount.eq(pair.cnab_amount))
        .filter(pending_reconciliations::Column::Status.ne(PendingStatus::Rejected.as_str()))
        .count(conn)
        .await?;
    Ok(count > 0)
}

async fn find_pending<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<pending_reconciliations::Model, ReconciliationRepoError> {
    pending_reconciliations::Entity::find_by_id(id)
        .filter(pending_reconciliations::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .ok_or(ReconciliationRepoError::NotFound(id))
}

/// Repository for reconciliation operations.
pub struct ReconciliationRepository {
    db: DatabaseConnection,
}

impl ReconciliationRepository {
    /// Creates a new reconciliation repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Queues matched pairs. Pairs already queued and not rejected are skipped.
    pub async fn store_pending(
        &self,
        tenant_id: Uuid,
        bank_account_id: Option<Uuid>,
        pairs: &[NewPending<'_>],
    ) -> Result<QueuedPairs, ReconciliationRepoError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let txn = rls.transaction();

        let mut queued = QueuedPairs::default();
        for new in pairs {
            let pair = new.pair;
            if already_queued(txn, tenant_id, pair).await? {
                queued.duplicates += 1;
                continue;
            }
            let row = pending_reconciliations::ActiveModel {
                id: Set(Uuid::now_v7()),
                tenant_id: Set(tenant_id),
                bank_account_id: Set(bank_account_id),
                ofx_fitid: Set(pair.ofx_fitid.clone()),
                ofx_amount: Set(pair.ofx_amount),
                ofx_date: Set(pair.ofx_date),
                ofx_description: Set(new.ofx_description.map(str::to_string)),
                cnab_reference: Set(pair.cnab_reference.clone()),
                cnab_document: Set(pair.cnab_document.clone()),
                cnab_amount: Set(pair.cnab_amount),
                cnab_date: Set(pair.cnab_date),
                confidence: Set(pair.confidence),
                invoice_id: Set(new.invoice.map(|m| m.invoice_id)),
                status: Set(PendingStatus::Pending.as_str().to_string()),
                resolved_at: Set(None),
                resolved_by: Set(None),
                created_at: Set(Utc::now().into()),
            }
            .insert(txn)
            .await?;
            queued.stored.push(row);
        }

        rls.commit().await?;
        tracing::info!(
            tenant_id = %tenant_id,
            stored = queued.stored.len(),
            duplicates = queued.duplicates,
            "Reconciliation pairs queued"
        );
        Ok(queued)
    }

    /// Pairs waiting for a decision, oldest credit first.
    pub async fn list_pending(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<pending_reconciliations::Model>, DbErr> {
        pending_reconciliations::Entity::find()
            .filter(pending_reconciliations::Column::TenantId.eq(tenant_id))
            .filter(pending_reconciliations::Column::Status.eq(PendingStatus::Pending.as_str()))
            .order_by_asc(pending_reconciliations::Column::OfxDate)
            .all(&self.db)
            .await
    }

    /// Approves a pair: the invoice is received on the bank credit date and
    /// the pair is closed.
    pub async fn approve(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        chart: &ChartCodes,
        user_id: Uuid,
    ) -> Result<pending_reconciliations::Model, ReconciliationRepoError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let txn = rls.transaction();

        let row = find_pending(txn, tenant_id, id).await?;
        pending_status(&row)?.ensure_pending()?;
        let invoice_id = row.invoice_id.ok_or(ReconciliationError::NoInvoice)?;

        let invoice = find_invoice(txn, tenant_id, invoice_id).await?;
        receive_invoice(
            txn,
            tenant_id,
            invoice,
            row.ofx_date,
            row.ofx_amount,
            chart,
            user_id,
        )
        .await?;

        let mut active = row.into_active_model();
        active.status = Set(PendingStatus::Approved.as_str().to_string());
        active.resolved_at = Set(Some(Utc::now().into()));
        active.resolved_by = Set(Some(user_id));
        let row = active.update(txn).await?;

        rls.commit().await?;
        tracing::info!(
            tenant_id = %tenant_id,
            reconciliation_id = %id,
            invoice_id = %invoice_id,
            "Reconciliation approved"
        );
        Ok(row)
    }

    /// Rejects a pair. Nothing is posted.
    pub async fn reject(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<pending_reconciliations::Model, ReconciliationRepoError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let txn = rls.transaction();

        let row = find_pending(txn, tenant_id, id).await?;
        pending_status(&row)?.ensure_pending()?;

        let mut active = row.into_active_model();
        active.status = Set(PendingStatus::Rejected.as_str().to_string());
        active.resolved_at = Set(Some(Utc::now().into()));
        active.resolved_by = Set(Some(user_id));
        let row = active.update(txn).await?;

        rls.commit().await?;
        tracing::info!(tenant_id = %tenant_id, reconciliation_id = %id, "Reconciliation rejected");
        Ok(row)
    }

    /// All rules of the tenant, highest priority first.
    pub async fn list_rules(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<reconciliation_rules::Model>, DbErr> {
        reconciliation_rules::Entity::find()
            .filter(reconciliation_rules::Column::TenantId.eq(tenant_id))
            .order_by_desc(reconciliation_rules::Column::Priority)
            .order_by_asc(reconciliation_rules::Column::Name)
            .all(&self.db)
            .await
    }

    /// Creates a rule after checking that its pattern compiles.
    pub async fn create_rule(
        &self,
        tenant_id: Uuid,
        input: &CreateRuleInput,
    ) -> Result<reconciliation_rules::Model, ReconciliationRepoError> {
        compile_rule_pattern(&input.pattern)?;

        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let rule = reconciliation_rules::ActiveModel {
            id: Set(Uuid::now_v7()),
            tenant_id: Set(tenant_id),
            name: Set(input.name.trim().to_string()),
            pattern: Set(input.pattern.clone()),
            rule_type: Set(input.rule_type.as_str().to_string()),
            target_category: Set(input.target_category.clone()),
            auto_match: Set(input.auto_match),
            is_active: Set(true),
            priority: Set(input.priority),
            created_at: Set(Utc::now().into()),
        }
        .insert(rls.transaction())
        .await?;
        rls.commit().await?;

        tracing::info!(tenant_id = %tenant_id, rule_id = %rule.id, "Reconciliation rule created");
        Ok(rule)
    }

    /// Active rules, as applied during import.
    pub async fn active_rules(&self, tenant_id: Uuid) -> Result<Vec<ReconciliationRule>, DbErr> {
        let rows = reconciliation_rules::Entity::find()
            .filter(reconciliation_rules::Column::TenantId.eq(tenant_id))
            .filter(reconciliation_rules::Column::IsActive.eq(true))
            .order_by_desc(reconciliation_rules::Column::Priority)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().filter_map(to_rule).collect())
    }
}
