//! Property-based tests for entry validation and posting templates.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::chart::ChartCodes;
use super::entry::{EntryLine, Side};
use super::error::LedgerError;
use super::templates::{SplitAllocation, collection_split, reclassification};
use super::validation::validate_lines;

/// Strategy to generate a valid positive amount (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn side_strategy() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Debit), Just(Side::Credit)]
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 20).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A zero-valued line is always rejected.
    #[test]
    fn prop_zero_line_rejected(side in side_strategy(), amount in positive_amount()) {
        let lines = vec![
            EntryLine::on(side, "1.1.1.05", Decimal::ZERO),
            EntryLine::on(side.opposite(), "3.1.1.01", amount),
        ];
        let result = validate_lines(&lines);
        prop_assert!(
            matches!(result, Err(LedgerError::InvalidLine { index: 0, .. })),
            "Zero line should be rejected, got: {:?}",
            result
        );
    }

    /// Any single line is rejected.
    #[test]
    fn prop_single_line_rejected(side in side_strategy(), amount in positive_amount()) {
        let result = validate_lines(&[EntryLine::on(side, "1.1.1.05", amount)]);
        prop_assert_eq!(result, Err(LedgerError::InsufficientLines));
    }

    /// Debits split over several lines balance a single credit of their sum.
    #[test]
    fn prop_multi_line_balanced_accepted(a in positive_amount(), b in positive_amount()) {
        let lines = vec![
            EntryLine::debit("4.1.1.01", a),
            EntryLine::debit("4.1.1.02", b),
            EntryLine::credit("1.1.1.05", a + b),
        ];
        let totals = validate_lines(&lines).unwrap();
        prop_assert_eq!(totals.debit, a + b);
        prop_assert_eq!(totals.credit, a + b);
    }

    /// Any difference between the sides is reported as unbalanced.
    #[test]
    fn prop_difference_rejected(a in positive_amount(), delta in positive_amount()) {
        let lines = vec![
            EntryLine::debit("1.1.1.05", a + delta),
            EntryLine::credit("3.1.1.01", a),
        ];
        prop_assert!(
            matches!(validate_lines(&lines), Err(LedgerError::Unbalanced { .. })),
            "imbalance of {} should be rejected", delta
        );
    }

    /// Reclassification always empties the source side it was parked on.
    #[test]
    fn prop_reclassification_reverses_source(side in side_strategy(), amount in positive_amount()) {
        let draft = reclassification(
            "1.1.9.01", "4.1.1.03", side, amount, date(), "reclass", Uuid::nil(),
        ).unwrap();
        prop_assert_eq!(draft.lines[0].side(), Some(side.opposite()));
        prop_assert_eq!(draft.lines[0].amount(), amount);
        prop_assert!(draft.validate().is_ok());
    }

    /// Splits are accepted exactly when the shares add up to the total.
    #[test]
    fn prop_split_must_add_up(shares in prop::collection::vec(positive_amount(), 1..6), extra in 0i64..3) {
        let total: Decimal = shares.iter().copied().sum::<Decimal>() + Decimal::new(extra, 2);
        let allocations: Vec<_> = shares
            .iter()
            .enumerate()
            .map(|(i, amount)| SplitAllocation {
                account_code: format!("1.1.2.01.{:04}", i + 1),
                amount: *amount,
                memo: None,
            })
            .collect();

        let result = collection_split(&ChartCodes::default(), total, &allocations, date(), "COB", Uuid::nil());
        if extra == 0 {
            prop_assert!(result.is_ok());
        } else {
            let is_mismatch = matches!(result, Err(LedgerError::SplitMismatch { .. }));
            prop_assert!(is_mismatch);
        }
    }
}
