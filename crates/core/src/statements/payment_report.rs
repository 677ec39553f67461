//! Boleto settlement reports exported by the collection bank.
//!
//! One record per line: `date|payer_doc|payer_name|amount|our_number|your_number`.

use contta_shared::types::parse_brl;
use rust_decimal::Decimal;

use super::dates::parse_date;
use super::error::StatementError;
use super::{Direction, ParsedStatement, StatementLine};

fn delimiter_for(line: &str) -> char {
    if line.contains('|') {
        '|'
    } else if line.contains(';') {
        ';'
    } else {
        ','
    }
}

/// Parses a payment report. Every record is a credit.
///
/// Blank lines and `#` comments are ignored; records with a bad date or a
/// non-positive amount are skipped with a warning (a header row is skipped
/// the same way).
///
/// # Errors
///
/// `StatementError::Empty` when the content has no records at all.
pub fn parse_payment_report(content: &str) -> Result<ParsedStatement, StatementError> {
    let records: Vec<(usize, &str)> = content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'))
        .collect();

    let Some((_, first)) = records.first() else {
        return Err(StatementError::Empty);
    };
    let delimiter = delimiter_for(first);

    let mut parsed = ParsedStatement::default();
    for (number, line) in records {
        let fields: Vec<&str> = line.split(delimiter).map(str::trim).collect();
        if fields.len() < 4 {
            parsed
                .warnings
                .push(format!("line {number}: expected at least 4 fields"));
            continue;
        }

        let Some(date) = parse_date(fields[0]) else {
            parsed
                .warnings
                .push(format!("line {number}: invalid date {:?}", fields[0]));
            continue;
        };
        let amount = match parse_brl(fields[3]) {
            Ok(amount) if amount > Decimal::ZERO => amount,
            _ => {
                parsed
                    .warnings
                    .push(format!("line {number}: invalid amount {:?}", fields[3]));
                continue;
            }
        };

        let payer_doc = fields[1];
        let payer_name = fields[2];
        let our_number = fields.get(4).copied().filter(|s| !s.is_empty());
        let your_number = fields.get(5).copied().filter(|s| !s.is_empty());

        parsed.lines.push(StatementLine {
            date,
            description: format!("{payer_name} - {payer_doc}"),
            amount,
            direction: Direction::Credit,
            reference: our_number.or(your_number).map(str::to_string),
        });
    }

    Ok(parsed)
}
