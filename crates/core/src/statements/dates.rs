//! Date formats found in Brazilian bank files.

use chrono::NaiveDate;

fn digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// `DD/MM/YYYY`, `DD-MM-YYYY`, `YYYY-MM-DD` or `DDMMYYYY`.
#[must_use]
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    let s = s.split_whitespace().next().unwrap_or(s);

    if let Some((y, rest)) = s.split_once('-') {
        if y.len() == 4 {
            let (m, d) = rest.split_once('-')?;
            return NaiveDate::from_ymd_opt(i32::try_from(digits(y)?).ok()?, digits(m)?, digits(d)?);
        }
    }

    let parts: Vec<&str> = s.split(['/', '-']).collect();
    if let [d, m, y] = parts.as_slice() {
        let year = match y.len() {
            4 => i32::try_from(digits(y)?).ok()?,
            2 => 2000 + i32::try_from(digits(y)?).ok()?,
            _ => return None,
        };
        return NaiveDate::from_ymd_opt(year, digits(m)?, digits(d)?);
    }

    if s.len() == 8 {
        return parse_ddmmyyyy(s);
    }
    None
}

/// `DDMMYYYY` (CNAB 240). Blank or all-zero fields are `None`.
#[must_use]
pub fn parse_ddmmyyyy(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.len() != 8 || !s.is_ascii() || s.bytes().all(|b| b == b'0') {
        return None;
    }
    NaiveDate::from_ymd_opt(
        i32::try_from(digits(&s[4..8])?).ok()?,
        digits(&s[2..4])?,
        digits(&s[0..2])?,
    )
}

/// `DDMMYY` (CNAB 400), years taken as 20YY. Blank or all-zero fields are `None`.
#[must_use]
pub fn parse_ddmmyy(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.len() != 6 || !s.is_ascii() || s.bytes().all(|b| b == b'0') {
        return None;
    }
    NaiveDate::from_ymd_opt(
        2000 + i32::try_from(digits(&s[4..6])?).ok()?,
        digits(&s[2..4])?,
        digits(&s[0..2])?,
    )
}

/// OFX `YYYYMMDD[HHMMSS[.sss]][[tz]]`; only the date part is kept.
#[must_use]
pub fn parse_ofx_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let date = s.get(0..8).filter(|d| d.is_ascii())?;
    NaiveDate::from_ymd_opt(
        i32::try_from(digits(&date[0..4])?).ok()?,
        digits(&date[4..6])?,
        digits(&date[6..8])?,
    )
}
