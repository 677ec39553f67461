//! Bank file parsers.
//!
//! Statements (OFX, CSV, boleto payment reports) become [`StatementLine`]s.
//! CNAB return files describe boleto settlements and become
//! [`cnab::CnabRecord`]s used by reconciliation.

pub mod cnab;
pub mod csv_file;
pub mod dates;
pub mod error;
pub mod idempotency;
pub mod ofx;
pub mod payment_report;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use cnab::{CnabFile, CnabFormat, CnabRecord, CnabStatus, detect_cnab_format, parse_cnab};
pub use csv_file::parse_csv;
pub use error::StatementError;
pub use idempotency::idempotency_key;
pub use ofx::{OfxStatement, OfxTransaction, parse_ofx};
pub use payment_report::parse_payment_report;

/// Direction of money relative to the bank account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Money in.
    Credit,
    /// Money out.
    Debit,
}

impl Direction {
    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            _ => Err(format!("Unknown direction: {s}")),
        }
    }
}

/// One movement of a bank statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementLine {
    /// Posting date.
    pub date: NaiveDate,
    /// Bank history text.
    pub description: String,
    /// Absolute amount.
    pub amount: Decimal,
    /// Money in or out.
    pub direction: Direction,
    /// Bank reference (FITID, document or nosso número).
    pub reference: Option<String>,
}

impl StatementLine {
    /// Amount with sign: positive for credits, negative for debits.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            Direction::Credit => self.amount,
            Direction::Debit => -self.amount,
        }
    }

    /// Builds a line from a signed amount.
    #[must_use]
    pub fn from_signed(
        date: NaiveDate,
        description: impl Into<String>,
        amount: Decimal,
        reference: Option<String>,
    ) -> Self {
        Self {
            date,
            description: description.into(),
            amount: amount.abs(),
            direction: if amount < Decimal::ZERO {
                Direction::Debit
            } else {
                Direction::Credit
            },
            reference,
        }
    }
}

/// Statement formats accepted for import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementFormat {
    /// OFX 1.x/2.x.
    Ofx,
    /// Delimited text with a header row.
    Csv,
    /// Boleto settlement list (`date|doc|name|amount|our|your`).
    PaymentReport,
}

impl std::str::FromStr for StatementFormat {
    type Err = StatementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ofx" => Ok(Self::Ofx),
            "csv" => Ok(Self::Csv),
            "payment_report" | "boleto_report" => Ok(Self::PaymentReport),
            other => Err(StatementError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Lines read from a statement plus the rows that had to be skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedStatement {
    /// Usable lines in file order.
    pub lines: Vec<StatementLine>,
    /// One message per skipped row.
    pub warnings: Vec<String>,
}

/// Parses statement content in the given format.
///
/// # Errors
///
/// Returns `StatementError` when the content is not in the declared format.
pub fn parse_statement(
    format: StatementFormat,
    content: &str,
) -> Result<ParsedStatement, StatementError> {
    match format {
        StatementFormat::Ofx => {
            let statement = parse_ofx(content)?;
            Ok(ParsedStatement {
                lines: statement.transactions.iter().map(OfxTransaction::to_line).collect(),
                warnings: Vec::new(),
            })
        }
        StatementFormat::Csv => parse_csv(content),
        StatementFormat::PaymentReport => parse_payment_report(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_signed_amount() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let line = StatementLine::from_signed(date, "Tarifa", dec!(-12.50), None);
        assert_eq!(line.direction, Direction::Debit);
        assert_eq!(line.amount, dec!(12.50));
        assert_eq!(line.signed_amount(), dec!(-12.50));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("OFX".parse::<StatementFormat>().unwrap(), StatementFormat::Ofx);
        assert_eq!(
            "payment_report".parse::<StatementFormat>().unwrap(),
            StatementFormat::PaymentReport
        );
        assert!(matches!(
            "pdf".parse::<StatementFormat>(),
            Err(StatementError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_parse_statement_dispatches() {
        let csv = "data;historico;valor\n02/01/2025;PIX RECEBIDO;100,00\n";
        let parsed = parse_statement(StatementFormat::Csv, csv).unwrap();
        assert_eq!(parsed.lines.len(), 1);
        assert_eq!(parsed.lines[0].amount, dec!(100.00));
    }
}
