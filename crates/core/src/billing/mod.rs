//! Receivables and payables: invoice/expense lifecycles and monthly fee
//! generation.

pub mod error;
pub mod fees;
pub mod status;

pub use error::BillingError;
pub use fees::{
    FEE_DUE_DAY, FeeClient, FeePlan, PlannedFee, fee_due_date, fee_reference, plan_monthly_fees,
};
pub use status::{ExpenseStatus, InvoiceStatus};
