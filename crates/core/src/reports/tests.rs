//! Tests for the reports module.

use std::collections::HashMap;

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use super::error::ReportError;
use super::service::ReportService;
use super::types::{ChartRow, Movement, PostedLine};
use crate::ledger::{ChartCodes, standard_chart};

fn chart() -> Vec<ChartRow> {
    let mut rows: Vec<ChartRow> = standard_chart(&ChartCodes::default())
        .into_iter()
        .map(|a| ChartRow {
            code: a.code,
            name: a.name,
            is_analytical: a.is_analytical,
        })
        .collect();
    rows.push(ChartRow {
        code: "1.1.2.01.0001".to_string(),
        name: "Padaria Sol".to_string(),
        is_analytical: true,
    });
    rows.push(ChartRow {
        code: "2.3.1.01".to_string(),
        name: "Capital Social".to_string(),
        is_analytical: true,
    });
    rows
}

fn sums(items: &[(&str, Decimal, Decimal)]) -> HashMap<String, Movement> {
    items
        .iter()
        .map(|(code, d, c)| ((*code).to_string(), Movement::new(*d, *c)))
        .collect()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Capital paid in during December. January has a fee invoice, its
/// collection, a power bill and a deposit parked in transitory credits.
fn december() -> HashMap<String, Movement> {
    sums(&[
        ("1.1.1.05", dec!(10000.00), Decimal::ZERO),
        ("2.3.1.01", Decimal::ZERO, dec!(10000.00)),
    ])
}

fn january() -> HashMap<String, Movement> {
    sums(&[
        ("1.1.1.05", dec!(1850.00), dec!(220.00)),
        ("1.1.2.01.0001", dec!(1500.00), dec!(1500.00)),
        ("2.1.9.01", Decimal::ZERO, dec!(350.00)),
        ("3.1.1.01", Decimal::ZERO, dec!(1500.00)),
        ("4.1.1.01", dec!(220.00), Decimal::ZERO),
    ])
}

#[test]
fn test_trial_balance_rolls_up_synthetic_accounts() {
    let report = ReportService::generate_trial_balance(
        "2025-01".parse().unwrap(),
        &chart(),
        &december(),
        &january(),
    );

    let row = |code: &str| report.accounts.iter().find(|a| a.code == code).unwrap();

    let bank = row("1.1.1.05");
    assert_eq!(bank.opening_balance, dec!(10000.00));
    assert_eq!(bank.balance, dec!(11630.00));

    let receivables = row("1.1.2.01");
    assert!(!receivables.is_analytical);
    assert_eq!(receivables.total_debit, dec!(1500.00));
    assert_eq!(receivables.balance, Decimal::ZERO);

    let assets = row("1");
    assert_eq!(assets.level, 0);
    assert_eq!(assets.balance, dec!(11630.00));

    assert_eq!(row("3").balance, dec!(1500.00));
    assert_eq!(row("4.1.1.01").balance, dec!(220.00));
}

#[test]
fn test_trial_balance_totals_count_analytical_rows_only() {
    let report = ReportService::generate_trial_balance(
        "2025-01".parse().unwrap(),
        &chart(),
        &december(),
        &january(),
    );

    assert_eq!(report.totals.total_debit, dec!(3570.00));
    assert_eq!(report.totals.total_credit, dec!(3570.00));
    assert_eq!(report.totals.debit_balances, dec!(11850.00));
    assert_eq!(report.totals.credit_balances, dec!(11850.00));
    assert!(report.totals.is_balanced);
}

#[test]
fn test_trial_balance_skips_untouched_accounts_and_orders_codes() {
    let report = ReportService::generate_trial_balance(
        "2025-01".parse().unwrap(),
        &chart(),
        &HashMap::new(),
        &sums(&[
            ("1.1.1.10", dec!(5.00), Decimal::ZERO),
            ("1.1.1.05", Decimal::ZERO, dec!(5.00)),
        ]),
    );

    let codes: Vec<&str> = report.accounts.iter().map(|a| a.code.as_str()).collect();
    assert_eq!(codes, ["1", "1.1", "1.1.1", "1.1.1.05", "1.1.1.10"]);
    // Posted outside the chart: listed under its own code.
    assert_eq!(report.accounts[4].name, "1.1.1.10");
    assert!(report.totals.is_balanced);
}

#[test]
fn test_unbalanced_movement_is_flagged() {
    let report = ReportService::generate_trial_balance(
        "2025-01".parse().unwrap(),
        &chart(),
        &HashMap::new(),
        &sums(&[("1.1.1.05", dec!(100.00), Decimal::ZERO)]),
    );
    assert!(!report.totals.is_balanced);
}

#[test]
fn test_income_statement_nets_revenue_and_expenses() {
    let report = ReportService::generate_income_statement(
        date(2025, 1, 1),
        date(2025, 1, 31),
        &chart(),
        &january(),
    )
    .unwrap();

    assert_eq!(report.revenue.total, dec!(1500.00));
    assert_eq!(report.expenses.total, dec!(220.00));
    assert_eq!(report.net_income, dec!(1280.00));
    assert!(report.revenue.accounts.iter().all(|a| a.code.starts_with('3')));
    assert!(report.expenses.accounts.iter().any(|a| a.code == "4.1.1.01"));
}

#[test]
fn test_income_statement_rejects_inverted_range() {
    let err = ReportService::generate_income_statement(
        date(2025, 2, 1),
        date(2025, 1, 31),
        &chart(),
        &HashMap::new(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        ReportError::InvalidDateRange {
            start: date(2025, 2, 1),
            end: date(2025, 1, 31),
        }
    );
    assert_eq!(err.error_code(), "invalid_range");
    assert_eq!(err.http_status_code(), 400);
}

#[test]
fn test_balance_sheet_carries_period_result_into_equity_side() {
    let mut cumulative = december();
    for (code, movement) in january() {
        *cumulative.entry(code).or_default() += movement;
    }

    let report = ReportService::generate_balance_sheet(date(2025, 1, 31), &chart(), &cumulative);

    assert_eq!(report.total_assets, dec!(11630.00));
    assert_eq!(report.current_assets.total, dec!(11630.00));
    assert_eq!(report.non_current_assets.total, Decimal::ZERO);
    assert_eq!(report.equity.total, dec!(10000.00));
    assert_eq!(report.current_liabilities.total, dec!(350.00));
    assert_eq!(report.period_result, dec!(1280.00));
    assert_eq!(report.liabilities_and_equity, dec!(11630.00));
    assert!(report.is_balanced);
    assert!(report.current_assets.accounts.iter().all(|a| a.level > 0));
    assert!(report.equity.accounts.iter().any(|a| a.code == "2.3"));
}

#[test]
fn test_balance_sheet_balances_when_books_balance() {
    let cumulative = sums(&[
        ("1.1.1.05", dec!(12000.00), dec!(220.00)),
        ("2.1.1.01", Decimal::ZERO, dec!(500.00)),
        ("2.3.1.01", Decimal::ZERO, dec!(10000.00)),
        ("3.1.1.01", Decimal::ZERO, dec!(2000.00)),
        ("4.1.1.01", dec!(720.00), Decimal::ZERO),
    ]);

    let report = ReportService::generate_balance_sheet(date(2025, 3, 31), &chart(), &cumulative);

    assert_eq!(report.total_assets, dec!(11780.00));
    assert_eq!(report.current_liabilities.total, dec!(500.00));
    assert_eq!(report.period_result, dec!(1280.00));
    assert!(report.is_balanced);
}

#[test]
fn test_account_ledger_running_balance() {
    let bank = ChartRow {
        code: "1.1.1.05".to_string(),
        name: "Banco Conta Movimento".to_string(),
        is_analytical: true,
    };
    let line = |day: u32, description: &str, debit: Decimal, credit: Decimal| PostedLine {
        entry_id: Uuid::new_v4(),
        entry_date: date(2025, 1, day),
        description: description.to_string(),
        memo: None,
        debit,
        credit,
    };

    let report = ReportService::generate_account_ledger(
        &bank,
        date(2025, 1, 1),
        date(2025, 1, 31),
        Movement::new(dec!(10000.00), Decimal::ZERO),
        vec![
            line(10, "Recebimento Padaria Sol", dec!(1500.00), Decimal::ZERO),
            line(15, "Energia Elétrica", Decimal::ZERO, dec!(220.00)),
            line(28, "Depósito não identificado", dec!(350.00), Decimal::ZERO),
        ],
    )
    .unwrap();

    let balances: Vec<Decimal> = report.lines.iter().map(|l| l.balance).collect();
    assert_eq!(balances, [dec!(11500.00), dec!(11280.00), dec!(11630.00)]);
    assert_eq!(report.opening_balance, dec!(10000.00));
    assert_eq!(report.closing_balance, dec!(11630.00));
    assert_eq!(report.total_debit, dec!(1850.00));
    assert_eq!(report.total_credit, dec!(220.00));
}

#[test]
fn test_account_ledger_credit_nature_and_empty_range() {
    let revenue = ChartRow {
        code: "3.1.1.01".to_string(),
        name: "Honorários Contábeis".to_string(),
        is_analytical: true,
    };
    let report = ReportService::generate_account_ledger(
        &revenue,
        date(2025, 2, 1),
        date(2025, 2, 28),
        Movement::new(Decimal::ZERO, dec!(1500.00)),
        Vec::new(),
    )
    .unwrap();

    assert!(report.lines.is_empty());
    assert_eq!(report.opening_balance, dec!(1500.00));
    assert_eq!(report.closing_balance, dec!(1500.00));
}

#[test]
fn test_account_ledger_rejects_code_without_group() {
    let odd = ChartRow {
        code: "9.1".to_string(),
        name: "Sem grupo".to_string(),
        is_analytical: true,
    };
    let err = ReportService::generate_account_ledger(
        &odd,
        date(2025, 1, 1),
        date(2025, 1, 31),
        Movement::default(),
        Vec::new(),
    )
    .unwrap_err();
    assert_eq!(err, ReportError::AccountNotFound("9.1".to_string()));
}

proptest! {
    /// Balanced entries always give a balanced trial balance, whatever the
    /// accounts they hit.
    #[test]
    fn test_balanced_entries_give_balanced_trial_balance(
        entries in prop::collection::vec((0usize..6, 0usize..6, 1i64..1_000_000), 1..30),
    ) {
        let codes = ["1.1.1.05", "1.1.2.01.0001", "2.1.1.01", "2.3.1.01", "3.1.1.01", "4.1.1.01"];
        let mut movement: HashMap<String, Movement> = HashMap::new();
        for (debit, credit, cents) in entries {
            let amount = Decimal::new(cents, 2);
            *movement.entry(codes[debit].to_string()).or_default() +=
                Movement::new(amount, Decimal::ZERO);
            *movement.entry(codes[credit].to_string()).or_default() +=
                Movement::new(Decimal::ZERO, amount);
        }

        let report = ReportService::generate_trial_balance(
            "2025-01".parse().unwrap(),
            &chart(),
            &HashMap::new(),
            &movement,
        );
        prop_assert!(report.totals.is_balanced);
        prop_assert_eq!(report.totals.total_debit, report.totals.total_credit);

        let sheet = ReportService::generate_balance_sheet(date(2025, 1, 31), &chart(), &movement);
        prop_assert!(sheet.is_balanced);
    }
}
