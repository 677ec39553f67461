//! Closing evaluation: decides whether a month may be signed off.

use contta_shared::types::{format_brl, round_cents};
use rust_decimal::Decimal;

use super::hash::closing_input_hash;
use super::types::{ClosingDecision, ClosingEvaluation, ClosingInput, MustFix};

/// Code emitted when the report is not OK but no individual check failed.
pub const INTEGRITY_FAILED: &str = "INTEGRITY_FAILED";
/// Code emitted for every transitory account with a nonzero balance.
pub const TRANSITORY_NOT_ZERO: &str = "TRANSITORY_NOT_ZERO";

/// Evaluates a month. Pure and deterministic.
///
/// The month is authorized iff the integrity report is OK (flag set and
/// every check passed) and every transitory balance rounds to zero.
#[must_use]
pub fn evaluate_closing(input: &ClosingInput) -> ClosingEvaluation {
    let mut must_fix = Vec::new();

    let mut failing: Vec<_> = input
        .integrity
        .checks
        .iter()
        .filter(|c| !c.passed())
        .collect();
    failing.sort_by(|a, b| a.code.cmp(&b.code));

    for check in &failing {
        must_fix.push(MustFix {
            code: check.code.clone(),
            message: format!("{}: {} violation(s)", check.description, check.violations),
            account_code: None,
            amount: None,
        });
    }

    if !input.integrity.ok && failing.is_empty() {
        must_fix.push(MustFix {
            code: INTEGRITY_FAILED.to_string(),
            message: "Integrity report is not OK".to_string(),
            account_code: None,
            amount: None,
        });
    }

    let mut nonzero: Vec<_> = input
        .transitory_balances
        .iter()
        .map(|b| (b, round_cents(b.balance)))
        .filter(|(_, balance)| *balance != Decimal::ZERO)
        .collect();
    nonzero.sort_by(|(a, _), (b, _)| a.account_code.cmp(&b.account_code));

    for (account, balance) in nonzero {
        must_fix.push(MustFix {
            code: TRANSITORY_NOT_ZERO.to_string(),
            message: format!(
                "Transitory account {} ({}) has balance {}",
                account.account_code,
                account.account_name,
                format_brl(balance)
            ),
            account_code: Some(account.account_code.clone()),
            amount: Some(balance),
        });
    }

    let decision = if must_fix.is_empty() {
        ClosingDecision::Authorized
    } else {
        ClosingDecision::Blocked
    };

    ClosingEvaluation {
        period: input.period,
        decision,
        must_fix,
        input_hash: closing_input_hash(input),
    }
}
