//! Invoice repository.
//!
//! Invoices are fee receivables. Creating one posts its provision entry;
//! settling one posts (or links) the payment entry.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use contta_core::billing::{BillingError, FeePlan, InvoiceStatus, plan_monthly_fees};
use contta_core::ledger::{
    ChartCodes, EntryDraft, EntryLine, EntryType, invoice_payment, invoice_provision,
};
use contta_core::reconciliation::InvoiceCandidate;
use contta_shared::types::{FiscalMonth, PageRequest};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use uuid::Uuid;

use super::entry::{EntryError, post_entry};
use crate::entities::{clients, invoices};
use crate::rls::RlsConnection;

/// Error types for invoice operations.
#[derive(Debug, thiserror::Error)]
pub enum InvoiceRepoError {
    /// Invoice not found.
    #[error("Invoice not found: {0}")]
    NotFound(Uuid),

    /// Client not found or inactive.
    #[error("Client not found: {0}")]
    ClientNotFound(Uuid),

    /// Status does not allow the operation.
    #[error(transparent)]
    Billing(#[from] BillingError),

    /// Provision or payment could not be posted.
    #[error(transparent)]
    Entry(#[from] EntryError),

    /// Stored status could not be decoded.
    #[error("Corrupt invoice record: {0}")]
    Corrupt(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoiceInput {
    /// Billed client.
    pub client_id: Uuid,
    /// Competence month; the provision is dated on its last day.
    pub competence: FiscalMonth,
    /// Description.
    pub description: String,
    /// Amount.
    pub amount: Decimal,
    /// Due date.
    pub due_date: NaiveDate,
    /// Boleto document number ("seu número").
    pub document_number: Option<String>,
    /// Idempotency reference.
    pub reference: Option<String>,
}

/// Filter for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    /// Status.
    pub status: Option<InvoiceStatus>,
    /// Client.
    pub client_id: Option<Uuid>,
    /// Competence.
    pub competence: Option<FiscalMonth>,
}

/// Outcome of monthly fee generation.
#[derive(Debug, Clone, Serialize)]
pub struct FeeGeneration {
    /// Competence billed.
    pub competence: FiscalMonth,
    /// Invoices created now.
    pub created: Vec<invoices::Model>,
    /// Clients already billed for the competence.
    pub already_generated: usize,
    /// Inactive clients or clients without a fee.
    pub ineligible: usize,
    /// Sum of the created invoices.
    pub total: Decimal,
}

/// Decodes the status column.
pub fn invoice_status(row: &invoices::Model) -> Result<InvoiceStatus, InvoiceRepoError> {
    row.status.parse().map_err(InvoiceRepoError::Corrupt)
}

/// Marks an invoice paid. `payment_entry_id` is the entry that settled it.
pub async fn settle_invoice<C: ConnectionTrait>(
    conn: &C,
    invoice: invoices::Model,
    paid_at: NaiveDate,
    paid_amount: Decimal,
    payment_entry_id: Option<Uuid>,
) -> Result<invoices::Model, InvoiceRepoError> {
    invoice_status(&invoice)?.ensure_payable()?;
    let mut active = invoice.into_active_model();
    active.status = Set(InvoiceStatus::Paid.as_str().to_string());
    active.paid_at = Set(Some(paid_at));
    active.paid_amount = Set(Some(paid_amount));
    active.payment_entry_id = Set(payment_entry_id);
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(conn).await?)
}

/// Posts the bank receipt of an invoice and marks it paid.
pub async fn receive_invoice<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    invoice: invoices::Model,
    paid_at: NaiveDate,
    paid_amount: Decimal,
    chart: &ChartCodes,
    user_id: Uuid,
) -> Result<invoices::Model, InvoiceRepoError> {
    invoice_status(&invoice)?.ensure_payable()?;
    let client = client_of(conn, tenant_id, invoice.client_id).await?;
    let draft = invoice_payment(
        chart,
        &client.account_code,
        paid_amount,
        paid_at,
        &format!("Recebimento {} - {}", invoice.description, client.name),
        invoice.id,
    )
    .map_err(EntryError::from)?;
    let entry_id = post_entry(conn, tenant_id, &draft, Some(user_id)).await?;
    settle_invoice(conn, invoice, paid_at, paid_amount, Some(entry_id)).await
}

async fn client_of<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    client_id: Uuid,
) -> Result<clients::Model, InvoiceRepoError> {
    clients::Entity::find_by_id(client_id)
        .filter(clients::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .ok_or(InvoiceRepoError::ClientNotFound(client_id))
}

/// Finds an invoice of the tenant on the caller's connection.
pub async fn find_invoice<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<invoices::Model, InvoiceRepoError> {
    invoices::Entity::find_by_id(id)
        .filter(invoices::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .ok_or(InvoiceRepoError::NotFound(id))
}

async fn insert_with_provision<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    client_account: &str,
    input: &CreateInvoiceInput,
    entry_date: NaiveDate,
    chart: &ChartCodes,
    user_id: Uuid,
) -> Result<invoices::Model, InvoiceRepoError> {
    let now = Utc::now().into();
    let invoice = invoices::ActiveModel {
        id: Set(Uuid::now_v7()),
        tenant_id: Set(tenant_id),
        client_id: Set(input.client_id),
        competence: Set(input.competence.to_string()),
        description: Set(input.description.clone()),
        amount: Set(input.amount),
        due_date: Set(input.due_date),
        status: Set(InvoiceStatus::Pending.as_str().to_string()),
        document_number: Set(input.document_number.clone()),
        reference: Set(input.reference.clone()),
        paid_at: Set(None),
        paid_amount: Set(None),
        provision_entry_id: Set(None),
        payment_entry_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;

    let draft = invoice_provision(
        chart,
        client_account,
        input.amount,
        entry_date,
        &input.description,
        invoice.id,
    )
    .map_err(EntryError::from)?;
    let entry_id = post_entry(conn, tenant_id, &draft, Some(user_id)).await?;

    let mut active = invoice.into_active_model();
    active.provision_entry_id = Set(Some(entry_id));
    Ok(active.update(conn).await?)
}

/// Reverses the provision lines of a cancelled invoice.
fn provision_reversal(
    chart: &ChartCodes,
    client_account: &str,
    invoice: &invoices::Model,
    on: NaiveDate,
) -> EntryDraft {
    EntryDraft::new(
        on,
        format!("Estorno - {}", invoice.description),
        EntryType::InvoiceProvision,
        vec![
            EntryLine::debit(&chart.fee_revenue, invoice.amount),
            EntryLine::credit(client_account, invoice.amount),
        ],
    )
    .referencing("invoice", invoice.id)
}

/// Repository for invoice operations.
pub struct InvoiceRepository {
    db: DatabaseConnection,
}

impl InvoiceRepository {
    /// Creates a new invoice repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an invoice and posts its provision.
    pub async fn create(
        &self,
        tenant_id: Uuid,
        input: &CreateInvoiceInput,
        chart: &ChartCodes,
        user_id: Uuid,
    ) -> Result<invoices::Model, InvoiceRepoError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let txn = rls.transaction();

        let client = client_of(txn, tenant_id, input.client_id).await?;
        if !client.is_active {
            return Err(InvoiceRepoError::ClientNotFound(input.client_id));
        }
        let invoice = insert_with_provision(
            txn,
            tenant_id,
            &client.account_code,
            input,
            input.competence.last_day(),
            chart,
            user_id,
        )
        .await?;

        rls.commit().await?;
        tracing::info!(tenant_id = %tenant_id, invoice_id = %invoice.id, "Invoice created");
        Ok(invoice)
    }

    /// Finds an invoice by id.
    pub async fn find(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<invoices::Model, InvoiceRepoError> {
        find_invoice(&self.db, tenant_id, id).await
    }

    /// Lists invoices, latest due first. Returns the page and the total count.
    pub async fn list(
        &self,
        tenant_id: Uuid,
        filter: &InvoiceFilter,
        page: &PageRequest,
    ) -> Result<(Vec<invoices::Model>, u64), DbErr> {
        let mut query = invoices::Entity::find().filter(invoices::Column::TenantId.eq(tenant_id));
        if let Some(status) = filter.status {
            query = query.filter(invoices::Column::Status.eq(status.as_str()));
        }
        if let Some(client_id) = filter.client_id {
            query = query.filter(invoices::Column::ClientId.eq(client_id));
        }
        if let Some(competence) = filter.competence {
            query = query.filter(invoices::Column::Competence.eq(competence.to_string()));
        }

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(invoices::Column::DueDate)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok((rows, total))
    }

    /// Cancels a pending invoice and reverses its provision on `on`.
    pub async fn cancel(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        on: NaiveDate,
        chart: &ChartCodes,
        user_id: Uuid,
    ) -> Result<invoices::Model, InvoiceRepoError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let txn = rls.transaction();

        let invoice = find_invoice(txn, tenant_id, id).await?;
        invoice_status(&invoice)?.ensure_cancellable()?;

        if invoice.provision_entry_id.is_some() {
            let client = client_of(txn, tenant_id, invoice.client_id).await?;
            let reversal = provision_reversal(chart, &client.account_code, &invoice, on);
            post_entry(txn, tenant_id, &reversal, Some(user_id)).await?;
        }

        let mut active = invoice.into_active_model();
        active.status = Set(InvoiceStatus::Canceled.as_str().to_string());
        active.updated_at = Set(Utc::now().into());
        let invoice = active.update(txn).await?;

        rls.commit().await?;
        tracing::info!(tenant_id = %tenant_id, invoice_id = %id, "Invoice cancelled");
        Ok(invoice)
    }

    /// Pending invoices offered to reconciliation.
    pub async fn candidates(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<InvoiceCandidate>, InvoiceRepoError> {
        invoices::Entity::find()
            .filter(invoices::Column::TenantId.eq(tenant_id))
            .filter(invoices::Column::Status.eq(InvoiceStatus::Pending.as_str()))
            .all(&self.db)
            .await?
            .iter()
            .map(|row| {
                Ok(InvoiceCandidate {
                    invoice_id: row.id,
                    document_number: row.document_number.clone(),
                    amount: row.amount,
                    due_date: row.due_date,
                    status: invoice_status(row)?,
                })
            })
            .collect()
    }

    /// Creates the month's fee invoices ("honorários") with their provisions.
    ///
    /// Clients already billed for the competence are skipped, so running it
    /// twice creates nothing new.
    pub async fn generate_monthly_fees(
        &self,
        tenant_id: Uuid,
        competence: FiscalMonth,
        fee_clients: &[contta_core::billing::FeeClient],
        chart: &ChartCodes,
        user_id: Uuid,
    ) -> Result<FeeGeneration, InvoiceRepoError> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let txn = rls.transaction();

        let existing: HashSet<String> = invoices::Entity::find()
            .filter(invoices::Column::TenantId.eq(tenant_id))
            .filter(invoices::Column::Competence.eq(competence.to_string()))
            .filter(invoices::Column::Reference.is_not_null())
            .all(txn)
            .await?
            .into_iter()
            .filter_map(|i| i.reference)
            .collect();

        let FeePlan {
            planned,
            already_generated,
            ineligible,
        } = plan_monthly_fees(fee_clients, competence, &existing);

        let mut created = Vec::with_capacity(planned.len());
        for fee in planned {
            let input = CreateInvoiceInput {
                client_id: fee.client_id,
                competence: fee.competence,
                description: format!("{} - {}", fee.description, fee.client_name),
                amount: fee.amount,
                due_date: fee.due_date,
                document_number: None,
                reference: Some(fee.reference),
            };
            created.push(
                insert_with_provision(
                    txn,
                    tenant_id,
                    &fee.account_code,
                    &input,
                    fee.entry_date,
                    chart,
                    user_id,
                )
                .await?,
            );
        }

        rls.commit().await?;
        let total = created.iter().map(|i| i.amount).sum();
        tracing::info!(
            tenant_id = %tenant_id,
            competence = %competence,
            created = created.len(),
            already_generated,
            ineligible,
            "Monthly fees generated"
        );
        Ok(FeeGeneration {
            competence,
            created,
            already_generated,
            ineligible,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn invoice(status: &str) -> invoices::Model {
        let now = Utc::now().into();
        invoices::Model {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            competence: "2025-01".to_string(),
            description: "Honorários contábeis 2025-01".to_string(),
            amount: dec!(1200.00),
            due_date: NaiveDate::from_ymd_opt(2025, 2, 10).unwrap(),
            status: status.to_string(),
            document_number: None,
            reference: None,
            paid_at: None,
            paid_amount: None,
            provision_entry_id: Some(Uuid::new_v4()),
            payment_entry_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_provision_reversal_balances() {
        let chart = ChartCodes::default();
        let inv = invoice("pending");
        let on = NaiveDate::from_ymd_opt(2025, 2, 3).unwrap();
        let draft = provision_reversal(&chart, "1.1.2.01.0001", &inv, on);

        let totals = draft.validate().unwrap();
        assert_eq!(totals.debit, dec!(1200.00));
        assert_eq!(draft.lines[0].account_code, "3.1.1.01");
        assert_eq!(draft.lines[1].account_code, "1.1.2.01.0001");
        assert_eq!(draft.reference_id, Some(inv.id));
        assert_eq!(draft.date, on);
    }

    #[test]
    fn test_invoice_status_decoding() {
        assert_eq!(invoice_status(&invoice("paid")).unwrap(), InvoiceStatus::Paid);
        assert!(matches!(
            invoice_status(&invoice("overdue")),
            Err(InvoiceRepoError::Corrupt(_))
        ));
    }
}
