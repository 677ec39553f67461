//! Billing errors.

use thiserror::Error;

use super::status::{ExpenseStatus, InvoiceStatus};

/// Errors raised by invoice and expense transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    /// The invoice is not pending.
    #[error("Invoice is {0}, expected pending")]
    InvoiceNotPending(InvoiceStatus),

    /// The expense is not pending.
    #[error("Expense is {0}, expected pending")]
    ExpenseNotPending(ExpenseStatus),
}

impl BillingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvoiceNotPending(_) => "invoice_not_pending",
            Self::ExpenseNotPending(_) => "expense_not_pending",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvoiceNotPending(_) | Self::ExpenseNotPending(_) => 409,
        }
    }
}
