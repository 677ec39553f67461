//! Delimited statement exports (internet banking "extrato" downloads).

use contta_shared::types::parse_brl;
use csv::{ReaderBuilder, StringRecord, Trim};

use super::dates::parse_date;
use super::error::StatementError;
use super::{ParsedStatement, StatementLine};

/// Column positions resolved from the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    date: usize,
    description: usize,
    amount: usize,
    reference: Option<usize>,
}

impl Columns {
    /// Matches header names (Portuguese or English), falling back to
    /// `date, description, amount[, reference]` by position.
    fn from_header(header: &StringRecord) -> Self {
        let find = |needles: &[&str]| {
            header.iter().position(|h| {
                let h = h.trim().to_lowercase();
                needles.iter().any(|n| h.contains(n))
            })
        };

        let date = find(&["data", "date"]).unwrap_or(0);
        let description = find(&["hist", "descri", "memo", "lançamento", "lancamento"]).unwrap_or(1);
        let amount = find(&["valor", "amount", "value"]).unwrap_or(2);
        let reference = find(&["ref", "doc", "fitid", "id"])
            .filter(|i| ![date, description, amount].contains(i))
            .or_else(|| (header.len() > 3).then_some(3));

        Self {
            date,
            description,
            amount,
            reference,
        }
    }
}

/// Parses a CSV statement. The first row is a header; `;` is the delimiter
/// when the header contains one, otherwise `,`.
///
/// Rows with an unreadable date or amount are skipped with a warning.
///
/// # Errors
///
/// `StatementError::Empty` when there is no header row.
pub fn parse_csv(content: &str) -> Result<ParsedStatement, StatementError> {
    let content = content.trim_start_matches('\u{feff}');
    let header_line = content
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or(StatementError::Empty)?;
    let delimiter = if header_line.contains(';') { b';' } else { b',' };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let header = reader
        .headers()
        .map_err(|e| StatementError::InvalidFormat(e.to_string()))?
        .clone();
    let columns = Columns::from_header(&header);

    let mut parsed = ParsedStatement::default();
    for (index, result) in reader.records().enumerate() {
        let row = index + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                parsed.warnings.push(format!("row {row}: {e}"));
                continue;
            }
        };
        if record.iter().all(str::is_empty) {
            continue;
        }

        let field = |i: usize| record.get(i).unwrap_or("");
        let Some(date) = parse_date(field(columns.date)) else {
            parsed
                .warnings
                .push(format!("row {row}: invalid date {:?}", field(columns.date)));
            continue;
        };
        let Ok(amount) = parse_brl(field(columns.amount)) else {
            parsed
                .warnings
                .push(format!("row {row}: invalid amount {:?}", field(columns.amount)));
            continue;
        };
        let reference = columns
            .reference
            .map(field)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        parsed.lines.push(StatementLine::from_signed(
            date,
            field(columns.description),
            amount,
            reference,
        ));
    }

    Ok(parsed)
}
