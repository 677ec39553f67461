//! Bank reconciliation.
//!
//! Statement credits are paired with settled boletos from CNAB return
//! files, boletos with the invoices they pay, and imported lines with
//! tenant-defined rules. Pairs wait in a pending queue until a user
//! approves or rejects them.

pub mod error;
pub mod invoice;
pub mod ofx_cnab;
pub mod rules;

use serde::{Deserialize, Serialize};

pub use error::ReconciliationError;
pub use invoice::{InvoiceCandidate, InvoiceMatch, InvoiceMatchMethod, match_invoice};
pub use ofx_cnab::{OfxCnabMatch, ReconciliationReport, match_ofx_cnab};
pub use rules::{
    ExpenseCandidate, ReconciliationRule, RuleMatch, RuleTarget, RuleType, apply_rules,
    compile_rule_pattern,
};

/// State of a queued reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    /// Waiting for a decision.
    Pending,
    /// Accepted and posted.
    Approved,
    /// Discarded.
    Rejected,
}

impl PendingStatus {
    /// Returns the snake_case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Only pending items may be approved or rejected.
    pub fn ensure_pending(self) -> Result<(), ReconciliationError> {
        match self {
            Self::Pending => Ok(()),
            other => Err(ReconciliationError::AlreadyResolved(other.as_str().to_string())),
        }
    }
}

impl std::str::FromStr for PendingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown reconciliation status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_pending() {
        assert!(PendingStatus::Pending.ensure_pending().is_ok());
        assert_eq!(
            PendingStatus::Approved.ensure_pending(),
            Err(ReconciliationError::AlreadyResolved("approved".to_string()))
        );
        assert_eq!("rejected".parse::<PendingStatus>(), Ok(PendingStatus::Rejected));
    }
}
