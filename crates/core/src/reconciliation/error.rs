//! Reconciliation errors.

use thiserror::Error;

use crate::statements::StatementError;

/// Errors raised while matching or resolving reconciliations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationError {
    /// The OFX side could not be read.
    #[error("Invalid OFX file: {0}")]
    InvalidOfx(StatementError),

    /// The CNAB side could not be read.
    #[error("Invalid CNAB file: {0}")]
    InvalidCnab(StatementError),

    /// A rule pattern is not a valid regular expression.
    #[error("Invalid rule pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// Offending pattern.
        pattern: String,
        /// Compiler message.
        reason: String,
    },

    /// Unknown rule type.
    #[error("Unknown rule type: {0}")]
    UnknownRuleType(String),

    /// The pending reconciliation was already approved or rejected.
    #[error("Reconciliation already {0}")]
    AlreadyResolved(String),

    /// Approval needs an invoice to settle.
    #[error("Reconciliation has no matched invoice")]
    NoInvoice,
}

impl ReconciliationError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidOfx(_) => "invalid_ofx",
            Self::InvalidCnab(_) => "invalid_cnab",
            Self::InvalidPattern { .. } => "invalid_pattern",
            Self::UnknownRuleType(_) => "unknown_rule_type",
            Self::AlreadyResolved(_) => "already_resolved",
            Self::NoInvoice => "no_invoice",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidOfx(_)
            | Self::InvalidCnab(_)
            | Self::InvalidPattern { .. }
            | Self::UnknownRuleType(_) => 400,
            Self::AlreadyResolved(_) => 409,
            Self::NoInvoice => 422,
        }
    }
}
