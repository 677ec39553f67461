//! Bank transaction repository.
//!
//! Imported statement lines are stored with an idempotency key. A line is
//! posted either from its classification or from the record a rule
//! matched; parked amounts are later reclassified or split among clients.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use contta_core::classification::{Classification, is_holding_account};
use contta_core::ledger::{
    ChartCodes, EntryType, LedgerError, Side, SplitAllocation, collection_split, ensure_date_open,
    reclassification,
};
use contta_shared::types::FiscalMonth;
use contta_core::reconciliation::{RuleMatch, RuleTarget};
use contta_core::statements::{Direction, StatementLine};
use contta_shared::types::PageRequest;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entry::{EntryError, period_status, post_entry};
use super::expense::{ExpenseRepoError, find_expense, pay_expense};
use super::invoice::{InvoiceRepoError, find_invoice, receive_invoice, settle_invoice};
use crate::entities::{accounting_entries, accounting_entry_lines, bank_transactions, clients};
use crate::rls::RlsConnection;

/// Error types for bank transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum BankTxRepoError {
    /// Transaction not found.
    #[error("Bank transaction not found: {0}")]
    NotFound(Uuid),

    /// Line was never posted, or its counterpart is not a transitory or
    /// pending account.
    #[error("Bank transaction {0} is not held in a transitory or pending account")]
    NotHeld(Uuid),

    /// Line was already reclassified or split.
    #[error("Bank transaction {0} was already cleared")]
    AlreadyCleared(Uuid),

    /// Split names an unknown client.
    #[error("Client not found: {0}")]
    ClientNotFound(Uuid),

    /// Split settles an invoice of another client.
    #[error("Invoice {invoice_id} does not belong to client {client_id}")]
    InvoiceMismatch {
        /// Invoice.
        invoice_id: Uuid,
        /// Client of the allocation.
        client_id: Uuid,
    },

    /// Entry template rejected the amounts.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Entry could not be posted.
    #[error(transparent)]
    Entry(#[from] EntryError),

    /// Matched invoice could not be settled.
    #[error(transparent)]
    Invoice(#[from] InvoiceRepoError),

    /// Matched expense could not be paid.
    #[error(transparent)]
    Expense(#[from] ExpenseRepoError),

    /// Stored direction or status could not be decoded.
    #[error("Corrupt bank transaction record: {0}")]
    Corrupt(String),

    /// Classification could not be stored.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// State of an imported line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankLineStatus {
    /// Stored, not posted.
    Pending,
    /// Posted to the ledger.
    Reconciled,
    /// Deliberately left out of the books.
    Ignored,
}

impl BankLineStatus {
    /// Returns the snake_case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reconciled => "reconciled",
            Self::Ignored => "ignored",
        }
    }
}

impl std::str::FromStr for BankLineStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "reconciled" => Ok(Self::Reconciled),
            "ignored" => Ok(Self::Ignored),
            _ => Err(format!("Unknown bank transaction status: {s}")),
        }
    }
}

/// A statement line about to be stored.
#[derive(Debug, Clone)]
pub struct NewBankLine<'a> {
    /// Parsed line.
    pub line: &'a StatementLine,
    /// Key that detects re-imports.
    pub idempotency_key: String,
    /// Account the statement belongs to.
    pub bank_account_id: Option<Uuid>,
    /// Uploaded file name.
    pub import_file: Option<String>,
}

/// How an imported line gets posted.
#[derive(Debug, Clone, Copy)]
pub enum Posting<'a> {
    /// Stored as pending.
    None,
    /// Posted from its classification.
    Classified(&'a Classification),
    /// Pays or receives the record a rule matched.
    Rule(&'a RuleMatch),
}

/// One client's share in a split request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SplitRequest {
    /// Paying client.
    pub client_id: Uuid,
    /// Invoice settled by the share.
    #[serde(default)]
    pub invoice_id: Option<Uuid>,
    /// Share.
    pub amount: Decimal,
}

/// Filter for listing bank transactions.
#[derive(Debug, Clone, Default)]
pub struct BankTxFilter {
    /// Status.
    pub status: Option<BankLineStatus>,
    /// On or after.
    pub from: Option<NaiveDate>,
    /// On or before.
    pub to: Option<NaiveDate>,
}

/// Rebuilds the statement line a row was imported from.
pub fn to_statement_line(row: &bank_transactions::Model) -> Result<StatementLine, BankTxRepoError> {
    Ok(StatementLine {
        date: row.transaction_date,
        description: row.description.clone(),
        amount: row.amount,
        direction: row.direction.parse().map_err(BankTxRepoError::Corrupt)?,
        reference: row.reference.clone(),
    })
}

/// Side on which a parked amount sits in its holding account.
#[must_use]
pub const fn held_on(direction: Direction) -> Side {
    match direction {
        Direction::Credit => Side::Credit,
        Direction::Debit => Side::Debit,
    }
}

async fn find_line<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<bank_transactions::Model, BankTxRepoError> {
    bank_transactions::Entity::find_by_id(id)
        .filter(bank_transactions::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .ok_or(BankTxRepoError::NotFound(id))
}

/// Fails when a reclassification or split already references the line.
async fn ensure_not_cleared<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<(), BankTxRepoError> {
    let cleared = accounting_entries::Entity::find()
        .filter(accounting_entries::Column::TenantId.eq(tenant_id))
        .filter(accounting_entries::Column::ReferenceType.eq("bank_transaction"))
        .filter(accounting_entries::Column::ReferenceId.eq(id))
        .filter(accounting_entries::Column::EntryType.is_in([
            EntryType::Reclassification.as_str(),
            EntryType::CollectionSplit.as_str(),
        ]))
        .count(conn)
        .await?;
    if cleared > 0 {
        return Err(BankTxRepoError::AlreadyCleared(id));
    }
    Ok(())
}

async fn counterpart_of_entry<C: ConnectionTrait>(
    conn: &C,
    entry_id: Uuid,
    chart: &ChartCodes,
) -> Result<Option<String>, DbErr> {
    let line = accounting_entry_lines::Entity::find()
        .filter(accounting_entry_lines::Column::EntryId.eq(entry_id))
        .filter(accounting_entry_lines::Column::AccountCode.ne(chart.bank.as_str()))
        .order_by_asc(accounting_entry_lines::Column::LineNumber)
        .one(conn)
        .await?;
    Ok(line.map(|l| l.account_code))
}

/// Repository for imported bank transactions.
pub struct BankTransactionRepository {
    db: DatabaseConnection,
}

impl BankTransactionRepository {
    /// Creates a new bank transaction repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Which of `keys` were already imported by the tenant.
    pub async fn existing_keys(
        &self,
        tenant_id: Uuid,
        keys: &[String],
    ) -> Result<HashSet<String>, DbErr> {
        if keys.is_empty() {
            return Ok(HashSet::new());
        }
        Ok(bank_transactions::Entity::find()
            .filter(bank_transactions::Column::TenantId.eq(tenant_id))
            .filter(bank_transactions::Column::IdempotencyKey.is_in(keys.iter().map(String::as_str)))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|t| t.idempotency_key)
            .collect())
    }

    /// Stores a line and posts it, all or nothing.
    ///
    /// A line dated in a closed month fails alone with `period_closed`;
    /// nothing is stored for it.
    pub async fn import_line(
        &self,
        tenant_id: Uuid,
        new: &NewBankLine<'_>,
        posting: Posting<'_>,
        chart: &ChartCodes,
        user_id: Uuid,
    ) -> Result<bank_transactions::Model, BankTxRepoError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let txn = rls.transaction();

        let status = period_status(txn, tenant_id, FiscalMonth::of(new.line.date)).await?;
        ensure_date_open(new.line.date, status)?;

        let id = Uuid::now_v7();
        let row = bank_transactions::ActiveModel {
            id: Set(id),
            tenant_id: Set(tenant_id),
            bank_account_id: Set(new.bank_account_id),
            transaction_date: Set(new.line.date),
            description: Set(new.line.description.clone()),
            amount: Set(new.line.amount),
            direction: Set(new.line.direction.as_str().to_string()),
            reference: Set(new.line.reference.clone()),
            idempotency_key: Set(new.idempotency_key.clone()),
            status: Set(BankLineStatus::Pending.as_str().to_string()),
            counterpart_account: Set(None),
            classification: Set(None),
            journal_entry_id: Set(None),
            reconciled_at: Set(None),
            import_file: Set(new.import_file.clone()),
            created_at: Set(Utc::now().into()),
        }
        .insert(txn)
        .await?;

        let posted = match posting {
            Posting::None => None,
            Posting::Classified(classification) => {
                let draft = classification.to_draft(new.line, id)?;
                let entry_id = post_entry(txn, tenant_id, &draft, Some(user_id)).await?;
                let counterpart = classification
                    .counterpart(chart)
                    .map(|l| l.account_code.clone());
                Some((entry_id, counterpart, serde_json::to_value(classification)?))
            }
            Posting::Rule(hit) => {
                let entry_id = match hit.target {
                    RuleTarget::Expense(expense_id) => {
                        let expense = find_expense(txn, tenant_id, expense_id).await?;
                        pay_expense(txn, tenant_id, expense, new.line.date, chart, user_id)
                            .await?
                            .payment_entry_id
                    }
                    RuleTarget::Invoice(invoice_id) => {
                        let invoice = find_invoice(txn, tenant_id, invoice_id).await?;
                        receive_invoice(
                            txn,
                            tenant_id,
                            invoice,
                            new.line.date,
                            new.line.amount,
                            chart,
                            user_id,
                        )
                        .await?
                        .payment_entry_id
                    }
                };
                match entry_id {
                    Some(entry_id) => Some((
                        entry_id,
                        counterpart_of_entry(txn, entry_id, chart).await?,
                        serde_json::to_value(hit)?,
                    )),
                    None => None,
                }
            }
        };

        let row = match posted {
            Some((entry_id, counterpart, classification)) => {
                let mut active = row.into_active_model();
                active.status = Set(BankLineStatus::Reconciled.as_str().to_string());
                active.journal_entry_id = Set(Some(entry_id));
                active.counterpart_account = Set(counterpart);
                active.classification = Set(Some(classification));
                active.reconciled_at = Set(Some(Utc::now().into()));
                active.update(txn).await?
            }
            None => row,
        };

        rls.commit().await?;
        Ok(row)
    }

    /// Finds a transaction by id.
    pub async fn find(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<bank_transactions::Model, BankTxRepoError> {
        find_line(&self.db, tenant_id, id).await
    }

    /// Lists transactions, newest first. Returns the page and the total count.
    pub async fn list(
        &self,
        tenant_id: Uuid,
        filter: &BankTxFilter,
        page: &PageRequest,
    ) -> Result<(Vec<bank_transactions::Model>, u64), DbErr> {
        let mut query = bank_transactions::Entity::find()
            .filter(bank_transactions::Column::TenantId.eq(tenant_id));
        if let Some(status) = filter.status {
            query = query.filter(bank_transactions::Column::Status.eq(status.as_str()));
        }
        if let Some(from) = filter.from {
            query = query.filter(bank_transactions::Column::TransactionDate.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(bank_transactions::Column::TransactionDate.lte(to));
        }

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(bank_transactions::Column::TransactionDate)
            .order_by_desc(bank_transactions::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok((rows, total))
    }

    /// Moves a parked amount into `target_code`.
    ///
    /// The entry is dated on the transaction date so the month's transitory
    /// balance clears.
    pub async fn reclassify(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        target_code: &str,
        chart: &ChartCodes,
        user_id: Uuid,
    ) -> Result<bank_transactions::Model, BankTxRepoError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let txn = rls.transaction();

        let row = find_line(txn, tenant_id, id).await?;
        let source = row
            .counterpart_account
            .clone()
            .filter(|code| row.journal_entry_id.is_some() && is_holding_account(code, chart))
            .ok_or(BankTxRepoError::NotHeld(id))?;
        ensure_not_cleared(txn, tenant_id, id).await?;

        let line = to_statement_line(&row)?;
        let draft = reclassification(
            &source,
            target_code,
            held_on(line.direction),
            row.amount,
            row.transaction_date,
            &format!("Reclassificação - {}", row.description),
            id,
        )?;
        let entry_id = post_entry(txn, tenant_id, &draft, Some(user_id)).await?;

        let mut active = row.into_active_model();
        active.counterpart_account = Set(Some(target_code.to_string()));
        let row = active.update(txn).await?;

        rls.commit().await?;
        tracing::info!(
            tenant_id = %tenant_id,
            bank_transaction_id = %id,
            entry_id = %entry_id,
            from = %source,
            to = %target_code,
            "Bank transaction reclassified"
        );
        Ok(row)
    }

    /// Splits a grouped collection among client accounts and settles the
    /// invoices the shares pay.
    pub async fn split(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        requests: &[SplitRequest],
        chart: &ChartCodes,
        user_id: Uuid,
    ) -> Result<Uuid, BankTxRepoError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let txn = rls.transaction();

        let row = find_line(txn, tenant_id, id).await?;
        if row.journal_entry_id.is_none()
            || row.counterpart_account.as_deref() != Some(chart.transitory_credits.as_str())
        {
            return Err(BankTxRepoError::NotHeld(id));
        }
        ensure_not_cleared(txn, tenant_id, id).await?;

        let mut allocations = Vec::with_capacity(requests.len());
        for request in requests {
            let client = clients::Entity::find_by_id(request.client_id)
                .filter(clients::Column::TenantId.eq(tenant_id))
                .one(txn)
                .await?
                .ok_or(BankTxRepoError::ClientNotFound(request.client_id))?;
            allocations.push(SplitAllocation {
                account_code: client.account_code,
                amount: request.amount,
                memo: Some(client.name),
            });
        }

        let draft = collection_split(
            chart,
            row.amount,
            &allocations,
            row.transaction_date,
            &format!("Desmembramento - {}", row.description),
            id,
        )?;
        let entry_id = post_entry(txn, tenant_id, &draft, Some(user_id)).await?;

        for request in requests {
            let Some(invoice_id) = request.invoice_id else {
                continue;
            };
            let invoice = find_invoice(txn, tenant_id, invoice_id).await?;
            if invoice.client_id != request.client_id {
                return Err(BankTxRepoError::InvoiceMismatch {
                    invoice_id,
                    client_id: request.client_id,
                });
            }
            settle_invoice(txn, invoice, row.transaction_date, request.amount, Some(entry_id))
                .await?;
        }

        rls.commit().await?;
        tracing::info!(
            tenant_id = %tenant_id,
            bank_transaction_id = %id,
            entry_id = %entry_id,
            shares = requests.len(),
            "Collection split"
        );
        Ok(entry_id)
    }
}
