//! Bank transaction classification.
//!
//! Rules recognize grouped collections, client receipts and common
//! expenses; everything else is parked in a transitory or pending account
//! with low confidence. An optional advisor may then propose a better
//! counterpart for the parked results.

pub mod advisor;
pub mod rules;
pub mod types;

pub use advisor::{
    AdvisorError, AdvisorSuggestion, ChartAccount, ClassificationAdvisor, Refinement, Rejection,
    refine_with_advisor,
};
pub use rules::{ClientDirectory, Classifier, KnownClient, UNIDENTIFIED_COLLECTION};
pub use types::{
    Classification, ClassificationKind, Confidence, ExpenseCategory, is_holding_account,
};
