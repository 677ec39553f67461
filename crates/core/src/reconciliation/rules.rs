//! Tenant-defined matching rules for imported statement lines.

use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use super::error::ReconciliationError;
use super::invoice::InvoiceCandidate;
use super::ofx_cnab::NEAR_DAY_CONFIDENCE;
use crate::billing::{ExpenseStatus, InvoiceStatus};
use crate::statements::StatementLine;

/// Largest difference between the line and the matched document.
pub const RULE_AMOUNT_TOLERANCE: Decimal = Decimal::ONE;

/// What a rule looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Pays a pending expense of the target category.
    Expense,
    /// Settles a pending invoice.
    Revenue,
}

impl RuleType {
    /// Returns the snake_case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Revenue => "revenue",
        }
    }
}

impl std::str::FromStr for RuleType {
    type Err = ReconciliationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expense" => Ok(Self::Expense),
            "revenue" => Ok(Self::Revenue),
            other => Err(ReconciliationError::UnknownRuleType(other.to_string())),
        }
    }
}

/// A stored rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationRule {
    /// Rule id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Case-insensitive regular expression over the description.
    pub pattern: String,
    /// Expense or revenue.
    pub rule_type: RuleType,
    /// Expense category to look for.
    pub target_category: Option<String>,
    /// Only auto-match rules act on their own.
    pub auto_match: bool,
    /// Disabled rules are ignored.
    pub is_active: bool,
    /// Higher runs first.
    pub priority: i32,
}

/// A pending expense that a bank debit may pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseCandidate {
    /// Expense id.
    pub expense_id: Uuid,
    /// Free-form category.
    pub category: Option<String>,
    /// Amount.
    pub amount: Decimal,
    /// Current status.
    pub status: ExpenseStatus,
}

/// Record a rule pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "id")]
pub enum RuleTarget {
    /// Expense to mark paid.
    Expense(Uuid),
    /// Invoice to mark paid.
    Invoice(Uuid),
}

/// A rule hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleMatch {
    /// Rule that fired.
    pub rule_id: Uuid,
    /// Its name.
    pub rule_name: String,
    /// Matched record.
    pub target: RuleTarget,
    /// Match certainty.
    pub confidence: Decimal,
}

/// Compiles a rule pattern the way [`apply_rules`] uses it.
pub fn compile_rule_pattern(pattern: &str) -> Result<Regex, ReconciliationError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ReconciliationError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

/// Runs active auto-match rules, highest priority first, against a line.
///
/// The first rule whose pattern matches the description and that finds a
/// pending record within one real of the amount wins. Rules with broken
/// patterns are skipped.
#[must_use]
pub fn apply_rules(
    line: &StatementLine,
    rules: &[ReconciliationRule],
    expenses: &[ExpenseCandidate],
    invoices: &[InvoiceCandidate],
) -> Option<RuleMatch> {
    let mut ordered: Vec<&ReconciliationRule> =
        rules.iter().filter(|r| r.is_active && r.auto_match).collect();
    ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

    let close = |amount: Decimal| (amount - line.amount).abs() < RULE_AMOUNT_TOLERANCE;

    for rule in ordered {
        let pattern = match compile_rule_pattern(&rule.pattern) {
            Ok(pattern) => pattern,
            Err(e) => {
                warn!(rule_id = %rule.id, error = %e, "Skipping rule");
                continue;
            }
        };
        if !pattern.is_match(&line.description) {
            continue;
        }

        let target = match rule.rule_type {
            RuleType::Expense => expenses
                .iter()
                .find(|e| {
                    e.status == ExpenseStatus::Pending
                        && close(e.amount)
                        && e.category.is_some()
                        && e.category == rule.target_category
                })
                .map(|e| RuleTarget::Expense(e.expense_id)),
            RuleType::Revenue => invoices
                .iter()
                .find(|i| i.status == InvoiceStatus::Pending && close(i.amount))
                .map(|i| RuleTarget::Invoice(i.invoice_id)),
        };

        if let Some(target) = target {
            return Some(RuleMatch {
                rule_id: rule.id,
                rule_name: rule.name.clone(),
                target,
                confidence: NEAR_DAY_CONFIDENCE,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn line(description: &str, amount: Decimal) -> StatementLine {
        StatementLine::from_signed(
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            description,
            amount,
            None,
        )
    }

    fn rule(n: u128, pattern: &str, rule_type: RuleType, priority: i32) -> ReconciliationRule {
        ReconciliationRule {
            id: Uuid::from_u128(n),
            name: format!("rule {n}"),
            pattern: pattern.to_string(),
            rule_type,
            target_category: Some("aluguel".to_string()),
            auto_match: true,
            is_active: true,
            priority,
        }
    }

    fn expense(n: u128, category: &str, amount: Decimal) -> ExpenseCandidate {
        ExpenseCandidate {
            expense_id: Uuid::from_u128(n),
            category: Some(category.to_string()),
            amount,
            status: ExpenseStatus::Pending,
        }
    }

    fn invoice(n: u128, amount: Decimal) -> InvoiceCandidate {
        InvoiceCandidate {
            invoice_id: Uuid::from_u128(n),
            document_number: None,
            amount,
            due_date: NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
            status: InvoiceStatus::Pending,
        }
    }

    #[test]
    fn test_expense_rule_matches_category_and_amount() {
        let rules = [rule(1, "imobiliaria", RuleType::Expense, 0)];
        let expenses = [
            expense(10, "energia", dec!(2000)),
            expense(11, "aluguel", dec!(2000.50)),
        ];
        let m = apply_rules(&line("PIX IMOBILIARIA XYZ", dec!(-2000)), &rules, &expenses, &[])
            .unwrap();
        assert_eq!(m.target, RuleTarget::Expense(Uuid::from_u128(11)));
        assert_eq!(m.confidence, dec!(0.95));
    }

    #[test]
    fn test_priority_order() {
        let rules = [
            rule(1, "PIX", RuleType::Expense, 1),
            rule(2, "PIX", RuleType::Revenue, 5),
        ];
        let m = apply_rules(
            &line("PIX RECEBIDO", dec!(300)),
            &rules,
            &[expense(10, "aluguel", dec!(300))],
            &[invoice(20, dec!(300.40))],
        )
        .unwrap();
        assert_eq!(m.rule_id, Uuid::from_u128(2));
        assert_eq!(m.target, RuleTarget::Invoice(Uuid::from_u128(20)));
    }

    #[test]
    fn test_inactive_manual_and_broken_rules_are_ignored() {
        let mut inactive = rule(1, "PIX", RuleType::Revenue, 0);
        inactive.is_active = false;
        let mut manual = rule(2, "PIX", RuleType::Revenue, 0);
        manual.auto_match = false;
        let broken = rule(3, "(", RuleType::Revenue, 9);

        let rules = [inactive, manual, broken];
        assert_eq!(
            apply_rules(&line("PIX", dec!(10)), &rules, &[], &[invoice(1, dec!(10))]),
            None
        );
    }

    #[test]
    fn test_amount_tolerance_is_strict() {
        let rules = [rule(1, ".", RuleType::Revenue, 0)];
        assert_eq!(
            apply_rules(&line("X", dec!(10)), &rules, &[], &[invoice(1, dec!(11))]),
            None
        );
    }

    #[test]
    fn test_rule_type_parse() {
        assert_eq!("revenue".parse::<RuleType>(), Ok(RuleType::Revenue));
        assert!(matches!(
            "income".parse::<RuleType>(),
            Err(ReconciliationError::UnknownRuleType(_))
        ));
        assert!(compile_rule_pattern("[").is_err());
    }
}
