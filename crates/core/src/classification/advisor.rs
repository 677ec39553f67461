//! Second opinion on low-confidence classifications.
//!
//! The advisor is an external model. Its answer only replaces the
//! counterpart of a result parked in a transitory or pending account, and
//! only when it is confident enough and names an account that exists.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::types::{Classification, Confidence, is_holding_account};
use crate::ledger::{ChartCodes, EntryLine};
use crate::statements::StatementLine;

/// An analytical account offered to the advisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartAccount {
    /// Dotted code.
    pub code: String,
    /// Display name.
    pub name: String,
}

/// The advisor's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorSuggestion {
    /// Suggested counterpart account.
    pub account_code: String,
    /// Self-reported confidence in `0..=1`.
    pub confidence: Decimal,
    /// Short explanation.
    #[serde(default)]
    pub rationale: String,
}

/// Failures talking to the advisor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdvisorError {
    /// The service could not be reached or kept failing.
    #[error("advisor unavailable: {0}")]
    Unavailable(String),

    /// The service answered something unusable.
    #[error("invalid advisor response: {0}")]
    InvalidResponse(String),
}

/// Suggests a counterpart account for a statement line.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClassificationAdvisor: Send + Sync {
    /// Picks one of `chart` for `line`.
    async fn suggest(
        &self,
        line: &StatementLine,
        chart: &[ChartAccount],
    ) -> Result<AdvisorSuggestion, AdvisorError>;
}

/// Why a suggestion was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Below the configured threshold.
    LowConfidence,
    /// Not an analytical account of the tenant.
    UnknownAccount,
    /// Names the bank or another holding account.
    HoldingAccount,
}

/// Outcome of [`refine_with_advisor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Refinement {
    /// Final classification.
    pub classification: Classification,
    /// What the advisor said, when it was asked and answered.
    pub suggestion: Option<AdvisorSuggestion>,
    /// Set when the suggestion was discarded.
    pub rejected: Option<Rejection>,
}

impl Refinement {
    fn unchanged(classification: Classification) -> Self {
        Self {
            classification,
            suggestion: None,
            rejected: None,
        }
    }

    /// Whether the advisor's account was applied.
    #[must_use]
    pub fn accepted(&self) -> bool {
        self.suggestion.is_some() && self.rejected.is_none()
    }
}

fn check(
    suggestion: &AdvisorSuggestion,
    chart: &[ChartAccount],
    codes: &ChartCodes,
    min_confidence: Decimal,
) -> Option<Rejection> {
    if suggestion.confidence < min_confidence || suggestion.confidence > Decimal::ONE {
        return Some(Rejection::LowConfidence);
    }
    if !chart.iter().any(|a| a.code == suggestion.account_code) {
        return Some(Rejection::UnknownAccount);
    }
    if suggestion.account_code == codes.bank || is_holding_account(&suggestion.account_code, codes)
    {
        return Some(Rejection::HoldingAccount);
    }
    None
}

/// Asks the advisor about a low-confidence, parked classification.
///
/// Anything else is returned untouched without calling the advisor. On
/// acceptance the counterpart line moves to the suggested account and the
/// confidence becomes `Medium`. Advisor errors are logged and the rule
/// result is kept.
pub async fn refine_with_advisor(
    classification: Classification,
    line: &StatementLine,
    chart: &[ChartAccount],
    codes: &ChartCodes,
    advisor: &dyn ClassificationAdvisor,
    min_confidence: Decimal,
) -> Refinement {
    if classification.confidence != Confidence::Low || !classification.is_held(codes) {
        return Refinement::unchanged(classification);
    }

    let suggestion = match advisor.suggest(line, chart).await {
        Ok(suggestion) => suggestion,
        Err(e) => {
            warn!(error = %e, description = %line.description, "Advisor failed, keeping rule result");
            return Refinement::unchanged(classification);
        }
    };

    if let Some(rejection) = check(&suggestion, chart, codes, min_confidence) {
        debug!(
            account_code = %suggestion.account_code,
            confidence = %suggestion.confidence,
            ?rejection,
            "Advisor suggestion discarded"
        );
        return Refinement {
            classification,
            suggestion: Some(suggestion),
            rejected: Some(rejection),
        };
    }

    let mut refined = classification;
    refined.lines = refined
        .lines
        .into_iter()
        .map(|l| {
            if l.account_code == codes.bank {
                l
            } else {
                EntryLine {
                    account_code: suggestion.account_code.clone(),
                    ..l
                }
            }
        })
        .collect();
    refined.confidence = Confidence::Medium;

    Refinement {
        classification: refined,
        suggestion: Some(suggestion),
        rejected: None,
    }
}
