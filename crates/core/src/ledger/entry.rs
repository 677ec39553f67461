//! Accounting entry domain types.

use chrono::NaiveDate;
use contta_shared::types::FiscalMonth;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::LedgerError;
use super::validation::{EntryTotals, validate_lines};

/// Side of an entry line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Debit (increases assets/expenses, decreases liabilities/equity/revenue).
    Debit,
    /// Credit (decreases assets/expenses, increases liabilities/equity/revenue).
    Credit,
}

impl Side {
    /// The other side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }
}

/// What produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Fee invoice provision (receivable against revenue).
    InvoiceProvision,
    /// Receipt of a fee invoice.
    InvoicePayment,
    /// Expense provision (expense against payable).
    ExpenseProvision,
    /// Payment of an expense.
    ExpensePayment,
    /// Automatic posting of an imported bank transaction.
    BankTransaction,
    /// Move out of a transitory or pending account.
    Reclassification,
    /// Distribution of a grouped collection among clients.
    CollectionSplit,
    /// Entered by hand.
    Manual,
}

impl EntryType {
    /// Returns the snake_case name stored in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvoiceProvision => "invoice_provision",
            Self::InvoicePayment => "invoice_payment",
            Self::ExpenseProvision => "expense_provision",
            Self::ExpensePayment => "expense_payment",
            Self::BankTransaction => "bank_transaction",
            Self::Reclassification => "reclassification",
            Self::CollectionSplit => "collection_split",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single line of an accounting entry. Exactly one of `debit`/`credit` is positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryLine {
    /// Chart of accounts code.
    pub account_code: String,
    /// Debit amount (zero on credit lines).
    pub debit: Decimal,
    /// Credit amount (zero on debit lines).
    pub credit: Decimal,
    /// Optional line memo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl EntryLine {
    /// Creates a debit line.
    #[must_use]
    pub fn debit(account_code: impl Into<String>, amount: Decimal) -> Self {
        Self {
            account_code: account_code.into(),
            debit: amount,
            credit: Decimal::ZERO,
            memo: None,
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub fn credit(account_code: impl Into<String>, amount: Decimal) -> Self {
        Self {
            account_code: account_code.into(),
            debit: Decimal::ZERO,
            credit: amount,
            memo: None,
        }
    }

    /// Creates a line on the given side.
    #[must_use]
    pub fn on(side: Side, account_code: impl Into<String>, amount: Decimal) -> Self {
        match side {
            Side::Debit => Self::debit(account_code, amount),
            Side::Credit => Self::credit(account_code, amount),
        }
    }

    /// Attaches a memo.
    #[must_use]
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// The side this line posts to, if exactly one side is positive.
    #[must_use]
    pub fn side(&self) -> Option<Side> {
        match (self.debit > Decimal::ZERO, self.credit > Decimal::ZERO) {
            (true, false) if self.credit.is_zero() => Some(Side::Debit),
            (false, true) if self.debit.is_zero() => Some(Side::Credit),
            _ => None,
        }
    }

    /// The posted amount regardless of side.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.debit + self.credit
    }
}

/// An entry ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    /// Accounting date (competence).
    pub date: NaiveDate,
    /// Entry history text.
    pub description: String,
    /// What produced the entry.
    pub entry_type: EntryType,
    /// Kind of record the entry belongs to (`invoice`, `expense`, `bank_transaction`).
    pub reference_type: Option<String>,
    /// Id of that record.
    pub reference_id: Option<Uuid>,
    /// Debit and credit lines.
    pub lines: Vec<EntryLine>,
}

impl EntryDraft {
    /// Creates a draft without a reference.
    #[must_use]
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        entry_type: EntryType,
        lines: Vec<EntryLine>,
    ) -> Self {
        Self {
            date,
            description: description.into(),
            entry_type,
            reference_type: None,
            reference_id: None,
            lines,
        }
    }

    /// Links the draft to the record that produced it.
    #[must_use]
    pub fn referencing(mut self, reference_type: &str, reference_id: Uuid) -> Self {
        self.reference_type = Some(reference_type.to_string());
        self.reference_id = Some(reference_id);
        self
    }

    /// The month this entry falls into.
    #[must_use]
    pub fn period(&self) -> FiscalMonth {
        FiscalMonth::of(self.date)
    }

    /// Validates the lines and returns the totals.
    pub fn validate(&self) -> Result<EntryTotals, LedgerError> {
        validate_lines(&self.lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_line_side() {
        assert_eq!(EntryLine::debit("1.1.1.05", dec!(10)).side(), Some(Side::Debit));
        assert_eq!(EntryLine::credit("3.1.1.01", dec!(10)).side(), Some(Side::Credit));

        let both = EntryLine {
            account_code: "1.1.1.05".into(),
            debit: dec!(1),
            credit: dec!(1),
            memo: None,
        };
        assert_eq!(both.side(), None);
        assert_eq!(EntryLine::debit("1.1.1.05", dec!(0)).side(), None);
        assert_eq!(EntryLine::debit("1.1.1.05", dec!(-5)).side(), None);
    }

    #[test]
    fn test_on_side() {
        let line = EntryLine::on(Side::Credit, "2.1.9.01", dec!(42.50)).with_memo("cobrança");
        assert_eq!(line.credit, dec!(42.50));
        assert_eq!(line.debit, Decimal::ZERO);
        assert_eq!(line.memo.as_deref(), Some("cobrança"));
        assert_eq!(Side::Credit.opposite(), Side::Debit);
    }

    #[test]
    fn test_draft_period_and_reference() {
        let id = Uuid::new_v4();
        let draft = EntryDraft::new(
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            "Honorários",
            EntryType::InvoiceProvision,
            vec![],
        )
        .referencing("invoice", id);

        assert_eq!(draft.period().to_string(), "2025-01");
        assert_eq!(draft.reference_type.as_deref(), Some("invoice"));
        assert_eq!(draft.reference_id, Some(id));
        assert_eq!(draft.entry_type.to_string(), "invoice_provision");
    }
}
