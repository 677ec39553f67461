//! Double-entry bookkeeping logic.
//!
//! This module implements the core ledger functionality:
//! - Entry lines and drafts (debits and credits by account code)
//! - Balance validation
//! - Standard postings for invoices, expenses, reclassifications and splits
//! - Chart of accounts helpers
//! - Closed-month guard

pub mod chart;
pub mod entry;
pub mod error;
pub mod fiscal;
pub mod templates;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use chart::{
    AccountType, ChartCodes, StandardAccount, account_type_for_code, next_client_account_code,
    payable_for, standard_chart,
};
pub use entry::{EntryDraft, EntryLine, EntryType, Side};
pub use error::LedgerError;
pub use fiscal::{ensure_date_open, ensure_period_open};
pub use templates::{
    SplitAllocation, collection_split, expense_payment, expense_provision, invoice_payment,
    invoice_provision, reclassification,
};
pub use validation::{EntryTotals, validate_lines};
