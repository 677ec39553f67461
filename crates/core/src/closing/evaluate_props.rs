//! Property-based tests for the closing evaluation.

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::evaluate::evaluate_closing;
use super::hash::closing_input_hash;
use super::types::{
    ClosingDecision, ClosingInput, IntegrityCheck, IntegrityReport, TransitoryBalance,
};

const CHECK_CODES: [&str; 4] = [
    "UNBALANCED_ENTRIES",
    "CLASSIFIED_NOT_RECONCILED",
    "RECONCILED_WITHOUT_TIMESTAMP",
    "PENDING_CLASSIFICATION",
];

/// Strategy for a cents amount between -10,000.00 and 10,000.00.
fn cents() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..1_000_000i64).prop_map(|c| Decimal::new(c, 2))
}

fn checks() -> impl Strategy<Value = Vec<IntegrityCheck>> {
    prop::collection::vec(0u64..4, CHECK_CODES.len()).prop_map(|counts| {
        CHECK_CODES
            .iter()
            .zip(counts)
            .map(|(code, n)| IntegrityCheck::new(*code, code.to_lowercase(), n))
            .collect()
    })
}

fn balances() -> impl Strategy<Value = Vec<TransitoryBalance>> {
    (cents(), cents()).prop_map(|(debits, credits)| {
        vec![
            TransitoryBalance {
                account_code: "1.1.9.01".into(),
                account_name: "Transitória Débitos".into(),
                balance: debits,
            },
            TransitoryBalance {
                account_code: "2.1.9.01".into(),
                account_name: "Transitória Créditos".into(),
                balance: credits,
            },
        ]
    })
}

fn make_input(checks: Vec<IntegrityCheck>, balances: Vec<TransitoryBalance>) -> ClosingInput {
    ClosingInput {
        tenant_id: Uuid::nil(),
        period: "2025-06".parse().unwrap(),
        integrity: IntegrityReport::from_checks(checks),
        transitory_balances: balances,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Authorized iff nothing must be fixed, and iff all checks pass and all balances are zero.
    #[test]
    fn prop_decision_matches_must_fix(checks in checks(), balances in balances()) {
        let all_pass = checks.iter().all(IntegrityCheck::passed);
        let all_zero = balances.iter().all(|b| b.balance.is_zero());
        let eval = evaluate_closing(&make_input(checks, balances));

        prop_assert_eq!(eval.decision == ClosingDecision::Authorized, eval.must_fix.is_empty());
        prop_assert_eq!(eval.decision == ClosingDecision::Authorized, all_pass && all_zero);
    }

    /// Permuting checks or balances never changes the hash or the must-fix list.
    #[test]
    fn prop_order_independent(checks in checks(), balances in balances()) {
        let forward = make_input(checks.clone(), balances.clone());
        let mut rev_checks = checks;
        rev_checks.reverse();
        let mut rev_balances = balances;
        rev_balances.reverse();
        let backward = make_input(rev_checks, rev_balances);

        prop_assert_eq!(closing_input_hash(&forward), closing_input_hash(&backward));
        prop_assert_eq!(evaluate_closing(&forward).must_fix, evaluate_closing(&backward).must_fix);
    }

    /// Rescaling a balance (`10` vs `10.00`) never changes the hash.
    #[test]
    fn prop_scale_independent(checks in checks(), balances in balances(), extra in 3u32..8) {
        let plain = make_input(checks.clone(), balances.clone());
        let rescaled_balances = balances
            .into_iter()
            .map(|mut b| {
                b.balance.rescale(extra);
                b
            })
            .collect();
        let rescaled = make_input(checks, rescaled_balances);

        prop_assert_eq!(closing_input_hash(&plain), closing_input_hash(&rescaled));
    }

    /// Changing any balance by a cent or any violation count changes the hash.
    #[test]
    fn prop_changes_are_detected(checks in checks(), balances in balances(), idx in 0usize..4) {
        let base = closing_input_hash(&make_input(checks.clone(), balances.clone()));

        let mut bumped_balances = balances.clone();
        bumped_balances[idx % 2].balance += Decimal::new(1, 2);
        prop_assert_ne!(&base, &closing_input_hash(&make_input(checks.clone(), bumped_balances)));

        let mut bumped_checks = checks;
        bumped_checks[idx].violations += 1;
        prop_assert_ne!(&base, &closing_input_hash(&make_input(bumped_checks, balances)));
    }
}
