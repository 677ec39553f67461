//! Ledger error types for validation and posting errors.

use contta_shared::types::FiscalMonth;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur while building or validating an accounting entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Entry must have at least 2 lines.
    #[error("Entry must have at least 2 lines")]
    InsufficientLines,

    /// A line is malformed (no account, both sides, no side, negative value).
    #[error("Line {index} is invalid: {reason}")]
    InvalidLine {
        /// Zero-based line index.
        index: usize,
        /// What is wrong with the line.
        reason: &'static str,
    },

    /// Entry is not balanced (debits != credits).
    #[error("Entry is not balanced. Debit: {debit}, Credit: {credit}")]
    Unbalanced {
        /// Total debits.
        debit: Decimal,
        /// Total credits.
        credit: Decimal,
    },

    /// Entry has only one side (all debits or all credits).
    #[error("Entry must have both debit and credit lines")]
    SingleSided,

    /// Template amounts must be positive.
    #[error("Amount must be greater than zero")]
    NonPositiveAmount,

    /// A split needs at least one allocation.
    #[error("Split needs at least one allocation")]
    EmptySplit,

    /// Split allocations do not add up to the collection amount.
    #[error("Allocations total {allocated} but the collection is {expected}")]
    SplitMismatch {
        /// Amount of the grouped collection.
        expected: Decimal,
        /// Sum of the allocations.
        allocated: Decimal,
    },

    /// Reclassification source and target are the same account.
    #[error("Source and target account are the same: {0}")]
    SameAccount(String),

    // ========== Chart Errors ==========
    /// No free analytical code left under the receivables parent.
    #[error("No free client account code under {0}")]
    ClientAccountsExhausted(String),

    // ========== Period Errors ==========
    /// Month is closed, no posting allowed.
    #[error("Period {0} is closed, no posting allowed")]
    PeriodClosed(FiscalMonth),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientLines => "insufficient_lines",
            Self::InvalidLine { .. } => "invalid_line",
            Self::Unbalanced { .. } => "unbalanced_entry",
            Self::SingleSided => "single_sided",
            Self::NonPositiveAmount => "invalid_amount",
            Self::EmptySplit => "empty_split",
            Self::SplitMismatch { .. } => "split_mismatch",
            Self::SameAccount(_) => "same_account",
            Self::ClientAccountsExhausted(_) => "client_accounts_exhausted",
            Self::PeriodClosed(_) => "period_closed",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input
            Self::InsufficientLines
            | Self::InvalidLine { .. }
            | Self::SingleSided
            | Self::NonPositiveAmount
            | Self::EmptySplit
            | Self::SameAccount(_) => 400,

            // 409 Conflict
            Self::ClientAccountsExhausted(_) => 409,

            // 422 Unprocessable - accounting rule violations
            Self::Unbalanced { .. } | Self::SplitMismatch { .. } | Self::PeriodClosed(_) => 422,
        }
    }
}
