//! Accounting reports built from the tenant chart.
//!
//! Every report starts from the debit and credit sums of the analytical
//! accounts. Synthetic accounts show the roll-up of the codes below them,
//! and report totals only count analytical rows so nothing is summed twice.
//!
//! - Trial balance (balancete) for a month, with opening and closing balances
//! - Income statement (DRE) for a date range
//! - Balance sheet (balanço patrimonial) at a date
//! - Account ledger (razão) for a date range, with a running balance

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::ReportError;
pub use service::{ReportService, ensure_range};
pub use types::*;
