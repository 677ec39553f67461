//! Report data types.

use std::ops::{Add, AddAssign};

use chrono::NaiveDate;
use contta_shared::types::FiscalMonth;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::AccountType;

/// An account of the tenant chart, as reports see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRow {
    /// Dotted code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Whether entries post to it.
    pub is_analytical: bool,
}

/// Debit and credit sums of one account over some window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    /// Sum of debits.
    pub debit: Decimal,
    /// Sum of credits.
    pub credit: Decimal,
}

impl Movement {
    /// Creates a movement.
    #[must_use]
    pub const fn new(debit: Decimal, credit: Decimal) -> Self {
        Self { debit, credit }
    }

    /// Balance in the natural sign of the group: debits minus credits for
    /// assets and expenses, credits minus debits otherwise.
    #[must_use]
    pub fn balance_for(&self, account_type: AccountType) -> Decimal {
        if account_type.is_debit_nature() {
            self.debit - self.credit
        } else {
            self.credit - self.debit
        }
    }

    /// Whether both sums are zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.debit.is_zero() && self.credit.is_zero()
    }
}

impl Add for Movement {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.debit + rhs.debit, self.credit + rhs.credit)
    }
}

impl AddAssign for Movement {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Balance of one account in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account group.
    pub account_type: AccountType,
    /// Whether entries post to it. Synthetic rows are roll-ups.
    pub is_analytical: bool,
    /// Depth in the chart (`1` is 0, `1.1.2` is 2).
    pub level: usize,
    /// Balance before the window, in the natural sign.
    pub opening_balance: Decimal,
    /// Debits inside the window.
    pub total_debit: Decimal,
    /// Credits inside the window.
    pub total_credit: Decimal,
    /// Balance at the end of the window, in the natural sign.
    pub balance: Decimal,
}

/// Trial balance (balancete) of a month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialBalanceReport {
    /// Month covered.
    pub period: FiscalMonth,
    /// Every account with an opening balance or movement, synthetic rows included.
    pub accounts: Vec<AccountBalance>,
    /// Totals over analytical accounts.
    pub totals: TrialBalanceTotals,
}

/// Trial balance totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceTotals {
    /// Debits of the month.
    pub total_debit: Decimal,
    /// Credits of the month.
    pub total_credit: Decimal,
    /// Closing balances on the debit side.
    pub debit_balances: Decimal,
    /// Closing balances on the credit side.
    pub credit_balances: Decimal,
    /// Whether debits equal credits, for the month and for closing balances.
    pub is_balanced: bool,
}

/// A block of accounts with its total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    /// Sum of the analytical balances.
    pub total: Decimal,
    /// Accounts in the block, synthetic rows included.
    pub accounts: Vec<AccountBalance>,
}

/// Income statement (DRE) of a date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeStatementReport {
    /// First day covered.
    pub period_start: NaiveDate,
    /// Last day covered.
    pub period_end: NaiveDate,
    /// Group `3`.
    pub revenue: ReportSection,
    /// Groups `4` and above.
    pub expenses: ReportSection,
    /// Revenue minus expenses.
    pub net_income: Decimal,
}

/// Balance sheet (balanço patrimonial) at a date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSheetReport {
    /// Date of the balances.
    pub as_of: NaiveDate,
    /// `1.1.*`
    pub current_assets: ReportSection,
    /// Other `1.*`
    pub non_current_assets: ReportSection,
    /// `2.1.*`
    pub current_liabilities: ReportSection,
    /// Other `2.*` outside equity.
    pub non_current_liabilities: ReportSection,
    /// `2.3.*`
    pub equity: ReportSection,
    /// Revenue minus expenses not yet closed into equity.
    pub period_result: Decimal,
    /// Total assets.
    pub total_assets: Decimal,
    /// Liabilities plus equity plus the period result.
    pub liabilities_and_equity: Decimal,
    /// Whether both sides match.
    pub is_balanced: bool,
}

/// A line posted to an account, as read from the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedLine {
    /// Entry the line belongs to.
    pub entry_id: Uuid,
    /// Entry date.
    pub entry_date: NaiveDate,
    /// Entry description.
    pub description: String,
    /// Line memo.
    pub memo: Option<String>,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
}

/// A ledger line with the balance after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLine {
    /// Entry the line belongs to.
    pub entry_id: Uuid,
    /// Entry date.
    pub entry_date: NaiveDate,
    /// Entry description.
    pub description: String,
    /// Line memo.
    pub memo: Option<String>,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Running balance in the natural sign.
    pub balance: Decimal,
}

/// Ledger (razão) of one account over a date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountLedgerReport {
    /// Account code.
    pub account_code: String,
    /// Account name.
    pub account_name: String,
    /// Account group.
    pub account_type: AccountType,
    /// First day covered.
    pub period_start: NaiveDate,
    /// Last day covered.
    pub period_end: NaiveDate,
    /// Balance before `period_start`.
    pub opening_balance: Decimal,
    /// Lines in date order.
    pub lines: Vec<LedgerLine>,
    /// Debits in the range.
    pub total_debit: Decimal,
    /// Credits in the range.
    pub total_credit: Decimal,
    /// Balance after the last line.
    pub closing_balance: Decimal,
}
