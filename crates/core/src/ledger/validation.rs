//! Business rule validation for accounting entries.

use rust_decimal::Decimal;
use serde::Serialize;

use super::entry::{EntryLine, Side};
use super::error::LedgerError;

/// Totals of a validated entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntryTotals {
    /// Sum of debit lines.
    pub debit: Decimal,
    /// Sum of credit lines.
    pub credit: Decimal,
}

/// Validates that a set of entry lines forms a balanced double entry.
///
/// Rules: at least two lines, every line names an account and posts a
/// positive value on exactly one side, both sides are present and the
/// debit total equals the credit total.
///
/// # Errors
///
/// Returns the first rule the lines violate.
pub fn validate_lines(lines: &[EntryLine]) -> Result<EntryTotals, LedgerError> {
    if lines.len() < 2 {
        return Err(LedgerError::InsufficientLines);
    }

    let mut debit = Decimal::ZERO;
    let mut credit = Decimal::ZERO;
    let mut has_debit = false;
    let mut has_credit = false;

    for (index, line) in lines.iter().enumerate() {
        if line.account_code.trim().is_empty() {
            return Err(LedgerError::InvalidLine {
                index,
                reason: "missing account code",
            });
        }
        if line.debit < Decimal::ZERO || line.credit < Decimal::ZERO {
            return Err(LedgerError::InvalidLine {
                index,
                reason: "negative amount",
            });
        }

        match line.side() {
            Some(Side::Debit) => {
                debit += line.debit;
                has_debit = true;
            }
            Some(Side::Credit) => {
                credit += line.credit;
                has_credit = true;
            }
            None if line.debit.is_zero() && line.credit.is_zero() => {
                return Err(LedgerError::InvalidLine {
                    index,
                    reason: "no amount",
                });
            }
            None => {
                return Err(LedgerError::InvalidLine {
                    index,
                    reason: "both debit and credit",
                });
            }
        }
    }

    if !has_debit || !has_credit {
        return Err(LedgerError::SingleSided);
    }

    if debit != credit {
        return Err(LedgerError::Unbalanced { debit, credit });
    }

    Ok(EntryTotals { debit, credit })
}
