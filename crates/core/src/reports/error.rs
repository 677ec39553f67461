//! Report error types.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur while building a report.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    /// Account code not in the tenant chart.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Start date after end date.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date.
        start: NaiveDate,
        /// End date.
        end: NaiveDate,
    },
}

impl ReportError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "account_not_found",
            Self::InvalidDateRange { .. } => "invalid_range",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::AccountNotFound(_) => 404,
            Self::InvalidDateRange { .. } => 400,
        }
    }
}
