//! CNAB return files (boleto collection), 400 and 240 column layouts.
//!
//! Positions below are 1-based and inclusive, as in the bank manuals.
//! Monetary fields carry two implied decimals.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::dates::{parse_ddmmyy, parse_ddmmyyyy};
use super::error::StatementError;

/// Layout of a return file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CnabFormat {
    /// 400 columns per record.
    Cnab400,
    /// 240 columns per record (FEBRABAN).
    Cnab240,
}

/// What happened to the boleto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CnabStatus {
    /// Entry confirmed by the bank.
    Registered,
    /// Paid.
    Settled,
    /// Written off without payment.
    WrittenOff,
    /// Any other occurrence.
    Other,
}

impl CnabStatus {
    /// Maps an occurrence/movement code.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "06" | "15" | "17" => Self::Settled,
            "02" => Self::Registered,
            "09" | "10" => Self::WrittenOff,
            _ => Self::Other,
        }
    }
}

/// One boleto occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CnabRecord {
    /// Nosso número (bank's boleto id).
    pub bank_reference: String,
    /// Seu número / document number (our invoice reference).
    pub document_number: String,
    /// Occurrence or movement code.
    pub occurrence_code: String,
    /// Status derived from the code.
    pub status: CnabStatus,
    /// Face value.
    pub face_value: Decimal,
    /// Amount paid (zero when not informed).
    pub paid_amount: Decimal,
    /// Due date.
    pub due_date: Option<NaiveDate>,
    /// Date of the occurrence.
    pub occurrence_date: Option<NaiveDate>,
    /// Date the money is credited to the account.
    pub credit_date: Option<NaiveDate>,
    /// 1-based line in the file.
    pub line_number: usize,
}

impl CnabRecord {
    /// Paid amount when informed, otherwise the face value.
    #[must_use]
    pub fn settlement_amount(&self) -> Decimal {
        if self.paid_amount > Decimal::ZERO {
            self.paid_amount
        } else {
            self.face_value
        }
    }

    /// Credit date, otherwise the occurrence date.
    #[must_use]
    pub fn settlement_date(&self) -> Option<NaiveDate> {
        self.credit_date.or(self.occurrence_date)
    }

    /// Returns true for settled boletos.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.status == CnabStatus::Settled
    }
}

/// A parsed return file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CnabFile {
    /// Detected layout.
    pub format: CnabFormat,
    /// Detail records in file order.
    pub records: Vec<CnabRecord>,
    /// Skipped records.
    pub warnings: Vec<String>,
}

/// Fixed-width view over one record.
struct Record {
    chars: Vec<char>,
    number: usize,
}

impl Record {
    fn new(line: &str, number: usize) -> Self {
        Self {
            chars: line.trim_end_matches(['\r', '\n']).chars().collect(),
            number,
        }
    }

    /// Columns `start..=end`, 1-based. Missing columns read as empty.
    fn field(&self, start: usize, end: usize) -> String {
        let from = start.saturating_sub(1).min(self.chars.len());
        let to = end.min(self.chars.len());
        self.chars[from..to.max(from)].iter().collect()
    }

    fn text(&self, start: usize, end: usize) -> String {
        self.field(start, end).trim().to_string()
    }

    fn at(&self, column: usize) -> Option<char> {
        self.chars.get(column.saturating_sub(1)).copied()
    }

    fn money(&self, start: usize, end: usize) -> Result<Decimal, String> {
        let raw = self.field(start, end);
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Decimal::ZERO);
        }
        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!(
                "line {}: non numeric value {raw:?} at {start}-{end}",
                self.number
            ));
        }
        let cents: i64 = raw
            .parse()
            .map_err(|_| format!("line {}: value out of range at {start}-{end}", self.number))?;
        Ok(Decimal::new(cents, 2))
    }
}

/// Detects the layout from the width of the first non-empty line.
#[must_use]
pub fn detect_cnab_format(content: &str) -> Option<CnabFormat> {
    let first = content
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .find(|l| !l.trim().is_empty())?;
    match first.chars().count() {
        400 => Some(CnabFormat::Cnab400),
        240 => Some(CnabFormat::Cnab240),
        _ => None,
    }
}

/// Parses detail records (type `1`) of a CNAB 400 return file.
#[must_use]
pub fn parse_cnab400(content: &str) -> CnabFile {
    let mut records = Vec::new();
    let mut warnings = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let record = Record::new(line, index + 1);
        if record.at(1) != Some('1') {
            continue;
        }

        let parsed = (|| -> Result<CnabRecord, String> {
            let occurrence_code = record.text(109, 110);
            Ok(CnabRecord {
                bank_reference: record.text(71, 82),
                document_number: record.text(117, 126),
                status: CnabStatus::from_code(&occurrence_code),
                occurrence_code,
                face_value: record.money(153, 165)?,
                paid_amount: record.money(254, 266)?,
                due_date: parse_ddmmyy(&record.field(147, 152)),
                occurrence_date: parse_ddmmyy(&record.field(111, 116)),
                credit_date: parse_ddmmyy(&record.field(296, 301)),
                line_number: record.number,
            })
        })();

        match parsed {
            Ok(r) => records.push(r),
            Err(w) => warnings.push(w),
        }
    }

    CnabFile {
        format: CnabFormat::Cnab400,
        records,
        warnings,
    }
}

/// Parses segment T/U pairs of a CNAB 240 return file.
#[must_use]
pub fn parse_cnab240(content: &str) -> CnabFile {
    let lines: Vec<Record> = content
        .lines()
        .enumerate()
        .map(|(i, l)| Record::new(l, i + 1))
        .collect();

    let mut records = Vec::new();
    let mut warnings = Vec::new();

    for (i, t) in lines.iter().enumerate() {
        if t.at(8) != Some('3') || t.at(14) != Some('T') {
            continue;
        }
        let u = lines
            .get(i + 1)
            .filter(|u| u.at(8) == Some('3') && u.at(14) == Some('U'));

        let parsed = (|| -> Result<CnabRecord, String> {
            let movement = t.text(16, 17);
            let (paid_amount, occurrence_date, credit_date) = match u {
                Some(u) => (
                    u.money(78, 92)?,
                    parse_ddmmyyyy(&u.field(138, 145)),
                    parse_ddmmyyyy(&u.field(146, 153)),
                ),
                None => (Decimal::ZERO, None, None),
            };
            Ok(CnabRecord {
                bank_reference: t.text(38, 57),
                document_number: t.text(59, 73),
                status: CnabStatus::from_code(&movement),
                occurrence_code: movement,
                face_value: t.money(82, 96)?,
                paid_amount,
                due_date: parse_ddmmyyyy(&t.field(74, 81)),
                occurrence_date,
                credit_date,
                line_number: t.number,
            })
        })();

        match parsed {
            Ok(r) => records.push(r),
            Err(w) => warnings.push(w),
        }
    }

    CnabFile {
        format: CnabFormat::Cnab240,
        records,
        warnings,
    }
}

/// Detects the layout and parses the file.
///
/// # Errors
///
/// `StatementError::InvalidFormat` when the width is neither 400 nor 240.
pub fn parse_cnab(content: &str) -> Result<CnabFile, StatementError> {
    match detect_cnab_format(content) {
        Some(CnabFormat::Cnab400) => Ok(parse_cnab400(content)),
        Some(CnabFormat::Cnab240) => Ok(parse_cnab240(content)),
        None => Err(StatementError::InvalidFormat(
            "CNAB records must be 400 or 240 columns wide".to_string(),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::too_many_arguments)]
pub(crate) mod fixtures {
    //! Builders for fixed-width test records.

    /// Writes `value` at 1-based `start` of a blank record of `width` columns.
    pub fn put(record: &mut Vec<char>, start: usize, value: &str) {
        for (offset, ch) in value.chars().enumerate() {
            record[start - 1 + offset] = ch;
        }
    }

    /// A CNAB 400 detail record.
    pub fn cnab400_detail(
        nosso_numero: &str,
        occurrence: &str,
        occurrence_date: &str,
        document: &str,
        due: &str,
        face_cents: u64,
        paid_cents: u64,
        credit_date: &str,
    ) -> String {
        let mut r = vec![' '; 400];
        put(&mut r, 1, "1");
        put(&mut r, 71, &format!("{nosso_numero:0>12}"));
        put(&mut r, 109, occurrence);
        put(&mut r, 111, occurrence_date);
        put(&mut r, 117, &format!("{document:<10}"));
        put(&mut r, 147, due);
        put(&mut r, 153, &format!("{face_cents:013}"));
        put(&mut r, 254, &format!("{paid_cents:013}"));
        put(&mut r, 296, credit_date);
        r.into_iter().collect()
    }

    /// A CNAB 400 header or trailer record.
    pub fn cnab400_other(kind: char) -> String {
        let mut r = vec![' '; 400];
        r[0] = kind;
        r.into_iter().collect()
    }

    /// A CNAB 240 segment T + U pair.
    pub fn cnab240_pair(
        movement: &str,
        nosso_numero: &str,
        document: &str,
        due: &str,
        face_cents: u64,
        paid_cents: u64,
        occurrence_date: &str,
        credit_date: &str,
    ) -> (String, String) {
        let mut t = vec![' '; 240];
        put(&mut t, 8, "3");
        put(&mut t, 14, "T");
        put(&mut t, 16, movement);
        put(&mut t, 38, &format!("{nosso_numero:<20}"));
        put(&mut t, 59, &format!("{document:<15}"));
        put(&mut t, 74, due);
        put(&mut t, 82, &format!("{face_cents:015}"));

        let mut u = vec![' '; 240];
        put(&mut u, 8, "3");
        put(&mut u, 14, "U");
        put(&mut u, 16, movement);
        put(&mut u, 78, &format!("{paid_cents:015}"));
        put(&mut u, 138, occurrence_date);
        put(&mut u, 146, credit_date);

        (t.into_iter().collect(), u.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, day)
    }

    #[rstest]
    #[case("06", CnabStatus::Settled)]
    #[case("15", CnabStatus::Settled)]
    #[case("17", CnabStatus::Settled)]
    #[case("02", CnabStatus::Registered)]
    #[case("09", CnabStatus::WrittenOff)]
    #[case("10", CnabStatus::WrittenOff)]
    #[case("28", CnabStatus::Other)]
    fn test_status_from_code(#[case] code: &str, #[case] status: CnabStatus) {
        assert_eq!(CnabStatus::from_code(code), status);
    }

    #[test]
    fn test_detect_format() {
        let file400 = format!("\n{}\n", cnab400_other('0'));
        assert_eq!(detect_cnab_format(&file400), Some(CnabFormat::Cnab400));
        let (t, _) = cnab240_pair("06", "1", "D", "00000000", 0, 0, "00000000", "00000000");
        assert_eq!(detect_cnab_format(&t), Some(CnabFormat::Cnab240));
        assert_eq!(detect_cnab_format("short line"), None);
        assert!(parse_cnab("short line").is_err());
    }

    #[test]
    fn test_parse_cnab400() {
        let content = [
            cnab400_other('0'),
            cnab400_detail("12345", "06", "150125", "HON-0001", "100125", 150_000, 149_550, "160125"),
            cnab400_detail("12346", "02", "020125", "HON-0002", "100225", 80_000, 0, "000000"),
            cnab400_other('9'),
        ]
        .join("\r\n");

        let file = parse_cnab(&content).unwrap();
        assert_eq!(file.format, CnabFormat::Cnab400);
        assert_eq!(file.records.len(), 2);
        assert!(file.warnings.is_empty());

        let settled = &file.records[0];
        assert_eq!(settled.bank_reference, "000000012345");
        assert_eq!(settled.document_number, "HON-0001");
        assert_eq!(settled.status, CnabStatus::Settled);
        assert_eq!(settled.face_value, dec!(1500.00));
        assert_eq!(settled.paid_amount, dec!(1495.50));
        assert_eq!(settled.settlement_amount(), dec!(1495.50));
        assert_eq!(settled.due_date, d(2025, 1, 10));
        assert_eq!(settled.settlement_date(), d(2025, 1, 16));
        assert_eq!(settled.line_number, 2);

        let registered = &file.records[1];
        assert_eq!(registered.status, CnabStatus::Registered);
        assert_eq!(registered.settlement_amount(), dec!(800.00));
        assert_eq!(registered.credit_date, None);
        assert_eq!(registered.settlement_date(), d(2025, 1, 2));
    }

    #[test]
    fn test_parse_cnab400_bad_value_is_warning() {
        let mut bad: Vec<char> =
            cnab400_detail("1", "06", "150125", "X", "100125", 100, 0, "160125").chars().collect();
        put(&mut bad, 153, "12AB");
        let content: String = bad.into_iter().collect();
        let file = parse_cnab400(&content);
        assert!(file.records.is_empty());
        assert_eq!(file.warnings.len(), 1);
    }

    #[test]
    fn test_parse_cnab240() {
        let (t1, u1) = cnab240_pair(
            "06", "000777", "HON-0003", "10012025", 250_000, 250_000, "14012025", "15012025",
        );
        let (t2, _) = cnab240_pair("02", "000778", "HON-0004", "10022025", 90_000, 0, "", "");
        let content = [t1, u1, t2].join("\n");

        let file = parse_cnab(&content).unwrap();
        assert_eq!(file.format, CnabFormat::Cnab240);
        assert_eq!(file.records.len(), 2);

        let first = &file.records[0];
        assert_eq!(first.bank_reference, "000777");
        assert_eq!(first.document_number, "HON-0003");
        assert!(first.is_settled());
        assert_eq!(first.face_value, dec!(2500.00));
        assert_eq!(first.settlement_amount(), dec!(2500.00));
        assert_eq!(first.due_date, d(2025, 1, 10));
        assert_eq!(first.occurrence_date, d(2025, 1, 14));
        assert_eq!(first.settlement_date(), d(2025, 1, 15));

        let second = &file.records[1];
        assert_eq!(second.status, CnabStatus::Registered);
        assert_eq!(second.paid_amount, Decimal::ZERO);
        assert_eq!(second.settlement_date(), None);
    }
}
