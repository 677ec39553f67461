//! Month-end closing domain types.

use contta_shared::types::FiscalMonth;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosingStatus {
    /// Never evaluated.
    Open,
    /// Last evaluation found must-fix items.
    Blocked,
    /// Last evaluation found nothing to fix; waiting for sign-off.
    Authorized,
    /// Signed off. No postings allowed.
    Closed,
    /// Closed once, reopened by an administrator.
    Reopened,
}

impl ClosingStatus {
    /// Returns the snake_case name stored in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Blocked => "blocked",
            Self::Authorized => "authorized",
            Self::Closed => "closed",
            Self::Reopened => "reopened",
        }
    }

    /// Returns true if entries dated in the month may be posted.
    #[must_use]
    pub const fn accepts_postings(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

impl std::fmt::Display for ClosingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClosingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "blocked" => Ok(Self::Blocked),
            "authorized" => Ok(Self::Authorized),
            "closed" => Ok(Self::Closed),
            "reopened" => Ok(Self::Reopened),
            _ => Err(format!("Unknown closing status: {s}")),
        }
    }
}

/// One integrity check computed over the month's records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityCheck {
    /// Stable check code (`UNBALANCED_ENTRIES`, ...).
    pub code: String,
    /// Human readable description.
    pub description: String,
    /// Number of offending records.
    pub violations: u64,
}

impl IntegrityCheck {
    /// Creates a check result.
    #[must_use]
    pub fn new(code: impl Into<String>, description: impl Into<String>, violations: u64) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            violations,
        }
    }

    /// A check passes when nothing violates it.
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.violations == 0
    }
}

/// Integrity report for a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Overall flag as reported by the producer.
    pub ok: bool,
    /// Individual checks.
    pub checks: Vec<IntegrityCheck>,
}

impl IntegrityReport {
    /// Builds a consistent report: `ok` iff every check passed.
    #[must_use]
    pub fn from_checks(checks: Vec<IntegrityCheck>) -> Self {
        Self {
            ok: checks.iter().all(IntegrityCheck::passed),
            checks,
        }
    }
}

/// Balance of a transitory account at the end of the month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitoryBalance {
    /// Account code.
    pub account_code: String,
    /// Account name.
    pub account_name: String,
    /// Cumulative debit minus credit.
    pub balance: Decimal,
}

/// Everything the closing decision depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingInput {
    /// Tenant.
    pub tenant_id: Uuid,
    /// Month being closed.
    pub period: FiscalMonth,
    /// Integrity report of the month.
    pub integrity: IntegrityReport,
    /// Transitory account balances at the month's last day.
    pub transitory_balances: Vec<TransitoryBalance>,
}

/// Something that must be fixed before the month can close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MustFix {
    /// Problem code.
    pub code: String,
    /// What is wrong.
    pub message: String,
    /// Offending account, for balance problems.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_code: Option<String>,
    /// Offending amount, for balance problems.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
}

/// Outcome of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosingDecision {
    /// Nothing to fix; the month may be signed off.
    Authorized,
    /// At least one must-fix item.
    Blocked,
}

impl ClosingDecision {
    /// Returns the snake_case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Authorized => "authorized",
            Self::Blocked => "blocked",
        }
    }

    /// Status a month takes after an evaluation with this decision.
    #[must_use]
    pub const fn resulting_status(&self) -> ClosingStatus {
        match self {
            Self::Authorized => ClosingStatus::Authorized,
            Self::Blocked => ClosingStatus::Blocked,
        }
    }
}

impl std::str::FromStr for ClosingDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorized" => Ok(Self::Authorized),
            "blocked" => Ok(Self::Blocked),
            _ => Err(format!("Unknown closing decision: {s}")),
        }
    }
}

/// Result of `evaluate_closing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingEvaluation {
    /// Month evaluated.
    pub period: FiscalMonth,
    /// Authorized iff `must_fix` is empty.
    pub decision: ClosingDecision,
    /// Problems found, integrity first, then balances by account code.
    pub must_fix: Vec<MustFix>,
    /// SHA-256 of the canonical input.
    pub input_hash: String,
}

impl ClosingEvaluation {
    /// Returns true if the month may be signed off.
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        self.decision == ClosingDecision::Authorized
    }
}
