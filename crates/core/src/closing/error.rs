//! Closing lifecycle errors.

use contta_shared::types::FiscalMonth;
use thiserror::Error;

use super::types::ClosingStatus;

/// Errors raised by closing state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClosingError {
    /// The month is already closed.
    #[error("Period {0} is closed")]
    AlreadyClosed(FiscalMonth),

    /// Sign-off requested for a month that was never evaluated.
    #[error("Period {0} has not been evaluated")]
    NotEvaluated(FiscalMonth),

    /// Sign-off requested for a blocked month.
    #[error("Period {0} has must-fix items and cannot be closed")]
    Blocked(FiscalMonth),

    /// Data changed since the evaluation.
    #[error("Evaluation of {0} is out of date, evaluate again")]
    StaleEvaluation(FiscalMonth),

    /// Reopen requested for a month that is not closed.
    #[error("Period {period} is {status}, only closed periods can be reopened")]
    NotClosed {
        /// Month.
        period: FiscalMonth,
        /// Current status.
        status: ClosingStatus,
    },
}

impl ClosingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyClosed(_) => "period_closed",
            Self::NotEvaluated(_) => "not_evaluated",
            Self::Blocked(_) => "closing_blocked",
            Self::StaleEvaluation(_) => "stale_evaluation",
            Self::NotClosed { .. } => "not_closed",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::AlreadyClosed(_)
            | Self::NotEvaluated(_)
            | Self::StaleEvaluation(_)
            | Self::NotClosed { .. } => 409,
            Self::Blocked(_) => 422,
        }
    }
}
