//! Month-end closing.
//!
//! A month is evaluated from two facts: the integrity report of its records
//! and the balances of the transitory accounts at its last day. The
//! evaluation carries a hash of those facts so a later sign-off can prove
//! nothing changed in between.

pub mod error;
pub mod evaluate;
pub mod hash;
pub mod lifecycle;
pub mod types;

#[cfg(test)]
mod evaluate_props;

pub use error::ClosingError;
pub use evaluate::{INTEGRITY_FAILED, TRANSITORY_NOT_ZERO, evaluate_closing};
pub use hash::closing_input_hash;
pub use lifecycle::{StoredEvaluation, ensure_can_evaluate, ensure_can_reopen, ensure_can_sign_off};
pub use types::{
    ClosingDecision, ClosingEvaluation, ClosingInput, ClosingStatus, IntegrityCheck,
    IntegrityReport, MustFix, TransitoryBalance,
};

/// Codes of the integrity checks computed over a month.
pub mod checks {
    /// Entries dated in the month whose debits and credits differ.
    pub const UNBALANCED_ENTRIES: &str = "UNBALANCED_ENTRIES";
    /// Bank transactions with a journal entry but not reconciled.
    pub const CLASSIFIED_NOT_RECONCILED: &str = "CLASSIFIED_NOT_RECONCILED";
    /// Reconciled bank transactions without a reconciliation timestamp.
    pub const RECONCILED_WITHOUT_TIMESTAMP: &str = "RECONCILED_WITHOUT_TIMESTAMP";
    /// Bank transactions of the month still waiting for classification.
    pub const PENDING_CLASSIFICATION: &str = "PENDING_CLASSIFICATION";
}
