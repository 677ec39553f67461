//! Standard postings. Every template returns a balanced, validated draft.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chart::{ChartCodes, payable_for};
use super::entry::{EntryDraft, EntryLine, EntryType, Side};
use super::error::LedgerError;

fn positive(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount > Decimal::ZERO {
        Ok(amount)
    } else {
        Err(LedgerError::NonPositiveAmount)
    }
}

fn finish(draft: EntryDraft) -> Result<EntryDraft, LedgerError> {
    draft.validate()?;
    Ok(draft)
}

/// D client receivable / C fee revenue.
pub fn invoice_provision(
    chart: &ChartCodes,
    client_account: &str,
    amount: Decimal,
    date: NaiveDate,
    description: &str,
    invoice_id: Uuid,
) -> Result<EntryDraft, LedgerError> {
    let amount = positive(amount)?;
    finish(
        EntryDraft::new(
            date,
            description,
            EntryType::InvoiceProvision,
            vec![
                EntryLine::debit(client_account, amount),
                EntryLine::credit(&chart.fee_revenue, amount),
            ],
        )
        .referencing("invoice", invoice_id),
    )
}

/// D bank / C client receivable.
pub fn invoice_payment(
    chart: &ChartCodes,
    client_account: &str,
    amount: Decimal,
    date: NaiveDate,
    description: &str,
    invoice_id: Uuid,
) -> Result<EntryDraft, LedgerError> {
    let amount = positive(amount)?;
    finish(
        EntryDraft::new(
            date,
            description,
            EntryType::InvoicePayment,
            vec![
                EntryLine::debit(&chart.bank, amount),
                EntryLine::credit(client_account, amount),
            ],
        )
        .referencing("invoice", invoice_id),
    )
}

/// D expense / C payable (derived from the expense code).
pub fn expense_provision(
    chart: &ChartCodes,
    expense_account: &str,
    amount: Decimal,
    date: NaiveDate,
    description: &str,
    expense_id: Uuid,
) -> Result<EntryDraft, LedgerError> {
    let amount = positive(amount)?;
    let payable = payable_for(expense_account, chart);
    finish(
        EntryDraft::new(
            date,
            description,
            EntryType::ExpenseProvision,
            vec![
                EntryLine::debit(expense_account, amount),
                EntryLine::credit(payable, amount),
            ],
        )
        .referencing("expense", expense_id),
    )
}

/// D payable / C bank.
pub fn expense_payment(
    chart: &ChartCodes,
    expense_account: &str,
    amount: Decimal,
    date: NaiveDate,
    description: &str,
    expense_id: Uuid,
) -> Result<EntryDraft, LedgerError> {
    let amount = positive(amount)?;
    let payable = payable_for(expense_account, chart);
    finish(
        EntryDraft::new(
            date,
            description,
            EntryType::ExpensePayment,
            vec![
                EntryLine::debit(payable, amount),
                EntryLine::credit(&chart.bank, amount),
            ],
        )
        .referencing("expense", expense_id),
    )
}

/// Moves `amount` out of a transitory or pending account into `target`.
///
/// `held_on` is the side the amount sits on in the source account: a
/// receipt parked on the credit side is debited out of it, an outflow
/// parked on the debit side is credited out of it.
pub fn reclassification(
    source_account: &str,
    target_account: &str,
    held_on: Side,
    amount: Decimal,
    date: NaiveDate,
    description: &str,
    bank_transaction_id: Uuid,
) -> Result<EntryDraft, LedgerError> {
    let amount = positive(amount)?;
    if source_account == target_account {
        return Err(LedgerError::SameAccount(source_account.to_string()));
    }
    finish(
        EntryDraft::new(
            date,
            description,
            EntryType::Reclassification,
            vec![
                EntryLine::on(held_on.opposite(), source_account, amount),
                EntryLine::on(held_on, target_account, amount),
            ],
        )
        .referencing("bank_transaction", bank_transaction_id),
    )
}

/// One client's share of a grouped collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitAllocation {
    /// Client receivable account credited.
    pub account_code: String,
    /// Amount received from that client.
    pub amount: Decimal,
    /// Line memo (usually the client's name).
    #[serde(default)]
    pub memo: Option<String>,
}

/// D transitory credits / C each client receivable.
///
/// # Errors
///
/// `EmptySplit` without allocations, `NonPositiveAmount` for a zero or
/// negative share, `SplitMismatch` when the shares do not add up to `total`.
pub fn collection_split(
    chart: &ChartCodes,
    total: Decimal,
    allocations: &[SplitAllocation],
    date: NaiveDate,
    description: &str,
    bank_transaction_id: Uuid,
) -> Result<EntryDraft, LedgerError> {
    let total = positive(total)?;
    if allocations.is_empty() {
        return Err(LedgerError::EmptySplit);
    }

    let mut allocated = Decimal::ZERO;
    let mut lines = Vec::with_capacity(allocations.len() + 1);
    lines.push(EntryLine::debit(&chart.transitory_credits, total));
    for allocation in allocations {
        let amount = positive(allocation.amount)?;
        allocated += amount;
        let line = EntryLine::credit(&allocation.account_code, amount);
        lines.push(match &allocation.memo {
            Some(memo) => line.with_memo(memo.clone()),
            None => line,
        });
    }

    if allocated != total {
        return Err(LedgerError::SplitMismatch {
            expected: total,
            allocated,
        });
    }

    finish(
        EntryDraft::new(date, description, EntryType::CollectionSplit, lines)
            .referencing("bank_transaction", bank_transaction_id),
    )
}
