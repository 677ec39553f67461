//! Classification results.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::{ChartCodes, EntryDraft, EntryLine, EntryType, LedgerError};
use crate::statements::StatementLine;

/// How sure the classifier is about a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Needs review.
    Low,
    /// Suggested by the advisor.
    Medium,
    /// Rule matched.
    High,
}

impl Confidence {
    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Expense groups recognized from the bank history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    /// Electricity.
    Energy,
    /// Water and sewage.
    Water,
    /// Phone and internet.
    Telecom,
    /// Bank charges.
    BankFees,
}

impl ExpenseCategory {
    /// Expense account for the category.
    #[must_use]
    pub fn account_code<'a>(&self, chart: &'a ChartCodes) -> &'a str {
        match self {
            Self::Energy => &chart.energy,
            Self::Water => &chart.water,
            Self::Telecom => &chart.telecom,
            Self::BankFees => &chart.bank_fees,
        }
    }

    /// Display name used in entry descriptions.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Energy => "Energia Elétrica",
            Self::Water => "Água e Esgoto",
            Self::Telecom => "Telefone/Internet",
            Self::BankFees => "Tarifas Bancárias",
        }
    }
}

/// What the line was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationKind {
    /// Grouped boleto collection to be split among clients.
    Collection,
    /// PIX/TED from an identified client.
    ClientReceipt,
    /// PIX/TED whose payer is unknown.
    UnidentifiedReceipt,
    /// Any other credit.
    UnidentifiedCredit,
    /// Recognized expense.
    Expense(ExpenseCategory),
    /// Any other debit.
    UnidentifiedDebit,
}

/// The entry proposed for a statement line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Recognized kind.
    pub kind: ClassificationKind,
    /// Proposed lines (bank plus counterpart).
    pub lines: Vec<EntryLine>,
    /// Entry history.
    pub description: String,
    /// Certainty.
    pub confidence: Confidence,
    /// Collection must be split among client accounts.
    pub needs_split: bool,
    /// `COBnnn` or `COB_NAO_IDENTIFICADO` for collections.
    pub collection_id: Option<String>,
    /// Client identified as payer.
    pub client_id: Option<Uuid>,
}

impl Classification {
    /// The non-bank line.
    #[must_use]
    pub fn counterpart(&self, chart: &ChartCodes) -> Option<&EntryLine> {
        self.lines.iter().find(|l| l.account_code != chart.bank)
    }

    /// Whether the counterpart sits in a transitory or pending account.
    #[must_use]
    pub fn is_held(&self, chart: &ChartCodes) -> bool {
        self.counterpart(chart)
            .is_some_and(|l| is_holding_account(&l.account_code, chart))
    }

    /// Posted amount.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.lines.iter().map(|l| l.debit).sum()
    }

    /// Builds the bank transaction entry.
    pub fn to_draft(
        &self,
        line: &StatementLine,
        bank_transaction_id: Uuid,
    ) -> Result<EntryDraft, LedgerError> {
        let draft = EntryDraft::new(
            line.date,
            &self.description,
            EntryType::BankTransaction,
            self.lines.clone(),
        )
        .referencing("bank_transaction", bank_transaction_id);
        draft.validate()?;
        Ok(draft)
    }
}

/// Transitory debits, transitory credits or pending identification.
#[must_use]
pub fn is_holding_account(code: &str, chart: &ChartCodes) -> bool {
    code == chart.transitory_debits
        || code == chart.transitory_credits
        || code == chart.pending_identification
}
