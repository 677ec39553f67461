//! Report generation service.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use contta_shared::types::FiscalMonth;
use rust_decimal::Decimal;

use super::error::ReportError;
use super::types::{
    AccountBalance, AccountLedgerReport, BalanceSheetReport, ChartRow, IncomeStatementReport,
    LedgerLine, Movement, PostedLine, ReportSection, TrialBalanceReport, TrialBalanceTotals,
};
use crate::ledger::{AccountType, account_type_for_code};

/// Rejects a range whose start is after its end.
///
/// # Errors
///
/// Returns `ReportError::InvalidDateRange` when `from > to`.
pub fn ensure_range(from: NaiveDate, to: NaiveDate) -> Result<(), ReportError> {
    if from > to {
        return Err(ReportError::InvalidDateRange {
            start: from,
            end: to,
        });
    }
    Ok(())
}

/// Service for generating accounting reports.
pub struct ReportService;

impl ReportService {
    /// Balances of every chart account touched before or inside the window.
    ///
    /// Analytical rows read their own sums. Synthetic rows add up every code
    /// below them. Codes posted but missing from the chart still show up, as
    /// analytical rows named after their code, so totals keep balancing.
    #[must_use]
    pub fn account_balances(
        chart: &[ChartRow],
        opening: &HashMap<String, Movement>,
        movement: &HashMap<String, Movement>,
    ) -> Vec<AccountBalance> {
        let posted: BTreeSet<&str> = opening
            .keys()
            .chain(movement.keys())
            .map(String::as_str)
            .collect();

        let mut rows: Vec<ChartRow> = chart.to_vec();
        for code in &posted {
            if !chart.iter().any(|row| row.code == *code) {
                rows.push(ChartRow {
                    code: (*code).to_string(),
                    name: (*code).to_string(),
                    is_analytical: true,
                });
            }
        }

        let mut balances: Vec<AccountBalance> = rows
            .into_iter()
            .filter_map(|row| {
                let account_type = account_type_for_code(&row.code)?;
                let (before, inside) = if row.is_analytical {
                    (
                        opening.get(&row.code).copied().unwrap_or_default(),
                        movement.get(&row.code).copied().unwrap_or_default(),
                    )
                } else {
                    let below = |sums: &HashMap<String, Movement>| {
                        sums.iter()
                            .filter(|(code, _)| covers(&row.code, code))
                            .fold(Movement::default(), |acc, (_, m)| acc + *m)
                    };
                    (below(opening), below(movement))
                };
                if before.is_zero() && inside.is_zero() {
                    return None;
                }
                Some(AccountBalance {
                    level: row.code.matches('.').count(),
                    opening_balance: before.balance_for(account_type),
                    total_debit: inside.debit,
                    total_credit: inside.credit,
                    balance: (before + inside).balance_for(account_type),
                    code: row.code,
                    name: row.name,
                    account_type,
                    is_analytical: row.is_analytical,
                })
            })
            .collect();
        balances.sort_by(|a, b| compare_codes(&a.code, &b.code));
        balances
    }

    /// Trial balance of a month from the sums before it and inside it.
    #[must_use]
    pub fn generate_trial_balance(
        period: FiscalMonth,
        chart: &[ChartRow],
        opening: &HashMap<String, Movement>,
        movement: &HashMap<String, Movement>,
    ) -> TrialBalanceReport {
        let accounts = Self::account_balances(chart, opening, movement);

        let mut total_debit = Decimal::ZERO;
        let mut total_credit = Decimal::ZERO;
        let mut debit_balances = Decimal::ZERO;
        let mut credit_balances = Decimal::ZERO;
        for account in accounts.iter().filter(|a| a.is_analytical) {
            total_debit += account.total_debit;
            total_credit += account.total_credit;
            let debit_side = if account.account_type.is_debit_nature() {
                account.balance
            } else {
                -account.balance
            };
            if debit_side >= Decimal::ZERO {
                debit_balances += debit_side;
            } else {
                credit_balances -= debit_side;
            }
        }

        TrialBalanceReport {
            period,
            accounts,
            totals: TrialBalanceTotals {
                total_debit,
                total_credit,
                debit_balances,
                credit_balances,
                is_balanced: total_debit == total_credit && debit_balances == credit_balances,
            },
        }
    }

    /// Income statement of `[from, to]` from the sums inside the range.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::InvalidDateRange` when `from > to`.
    pub fn generate_income_statement(
        from: NaiveDate,
        to: NaiveDate,
        chart: &[ChartRow],
        movement: &HashMap<String, Movement>,
    ) -> Result<IncomeStatementReport, ReportError> {
        ensure_range(from, to)?;

        let mut revenue = ReportSection::default();
        let mut expenses = ReportSection::default();
        for account in Self::account_balances(chart, &HashMap::new(), movement) {
            match account.account_type {
                AccountType::Revenue => add_to_section(&mut revenue, account),
                AccountType::Expense => add_to_section(&mut expenses, account),
                _ => {}
            }
        }

        Ok(IncomeStatementReport {
            period_start: from,
            period_end: to,
            net_income: revenue.total - expenses.total,
            revenue,
            expenses,
        })
    }

    /// Balance sheet at `as_of` from the cumulative sums up to that day.
    ///
    /// Revenue and expense accounts are not listed; their net shows as the
    /// period result on the equity side. Group roots (`1`, `2`) are left out
    /// of the sections since the totals already cover them.
    #[must_use]
    pub fn generate_balance_sheet(
        as_of: NaiveDate,
        chart: &[ChartRow],
        cumulative: &HashMap<String, Movement>,
    ) -> BalanceSheetReport {
        let mut current_assets = ReportSection::default();
        let mut non_current_assets = ReportSection::default();
        let mut current_liabilities = ReportSection::default();
        let mut non_current_liabilities = ReportSection::default();
        let mut equity = ReportSection::default();
        let mut period_result = Decimal::ZERO;

        for account in Self::account_balances(chart, &HashMap::new(), cumulative) {
            match account.account_type {
                AccountType::Revenue if account.is_analytical => period_result += account.balance,
                AccountType::Expense if account.is_analytical => period_result -= account.balance,
                AccountType::Revenue | AccountType::Expense => {}
                _ if account.level == 0 => {}
                AccountType::Asset if covers("1.1", &account.code) => {
                    add_to_section(&mut current_assets, account);
                }
                AccountType::Asset => add_to_section(&mut non_current_assets, account),
                AccountType::Liability if covers("2.1", &account.code) => {
                    add_to_section(&mut current_liabilities, account);
                }
                AccountType::Liability => add_to_section(&mut non_current_liabilities, account),
                AccountType::Equity => add_to_section(&mut equity, account),
            }
        }

        let total_assets = current_assets.total + non_current_assets.total;
        let liabilities_and_equity = current_liabilities.total
            + non_current_liabilities.total
            + equity.total
            + period_result;

        BalanceSheetReport {
            as_of,
            current_assets,
            non_current_assets,
            current_liabilities,
            non_current_liabilities,
            equity,
            period_result,
            total_assets,
            liabilities_and_equity,
            is_balanced: total_assets == liabilities_and_equity,
        }
    }

    /// Ledger of one account: opening balance, then each line with the
    /// balance after it. Lines are expected in posting order.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::InvalidDateRange` when `from > to` and
    /// `ReportError::AccountNotFound` when the code has no group.
    pub fn generate_account_ledger(
        account: &ChartRow,
        from: NaiveDate,
        to: NaiveDate,
        opening: Movement,
        lines: Vec<PostedLine>,
    ) -> Result<AccountLedgerReport, ReportError> {
        ensure_range(from, to)?;
        let account_type = account_type_for_code(&account.code)
            .ok_or_else(|| ReportError::AccountNotFound(account.code.clone()))?;

        let opening_balance = opening.balance_for(account_type);
        let mut running = opening;
        let mut inside = Movement::default();
        let lines = lines
            .into_iter()
            .map(|line| {
                let moved = Movement::new(line.debit, line.credit);
                running += moved;
                inside += moved;
                LedgerLine {
                    entry_id: line.entry_id,
                    entry_date: line.entry_date,
                    description: line.description,
                    memo: line.memo,
                    debit: line.debit,
                    credit: line.credit,
                    balance: running.balance_for(account_type),
                }
            })
            .collect();

        Ok(AccountLedgerReport {
            account_code: account.code.clone(),
            account_name: account.name.clone(),
            account_type,
            period_start: from,
            period_end: to,
            opening_balance,
            lines,
            total_debit: inside.debit,
            total_credit: inside.credit,
            closing_balance: running.balance_for(account_type),
        })
    }
}

fn add_to_section(section: &mut ReportSection, account: AccountBalance) {
    if account.is_analytical {
        section.total += account.balance;
    }
    section.accounts.push(account);
}

/// Whether `code` is `parent` or sits below it.
fn covers(parent: &str, code: &str) -> bool {
    code.strip_prefix(parent)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

/// Orders dotted codes segment by segment (`1.1.2` before `1.1.10`).
fn compare_codes(a: &str, b: &str) -> Ordering {
    let key = |code: &str| -> Vec<u64> {
        code.split('.')
            .map(|seg| seg.parse().unwrap_or(u64::MAX))
            .collect()
    };
    key(a).cmp(&key(b))
}
