//! CNPJ and CPF taxpayer numbers.

use serde::Serialize;
use thiserror::Error;

/// Kind of taxpayer number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Company, 14 digits.
    Cnpj,
    /// Person, 11 digits.
    Cpf,
}

impl DocumentKind {
    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cnpj => "cnpj",
            Self::Cpf => "cpf",
        }
    }
}

/// Errors validating a taxpayer number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// Neither 11 nor 14 digits.
    #[error("Document must have 11 (CPF) or 14 (CNPJ) digits, got {0}")]
    WrongLength(usize),

    /// All digits equal (`000...`, `111...`).
    #[error("Document has repeated digits")]
    RepeatedDigits,

    /// Check digits do not match.
    #[error("Invalid {0:?} check digits")]
    CheckDigits(DocumentKind),
}

/// A validated CNPJ or CPF, digits only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxDocument {
    kind: DocumentKind,
    digits: String,
}

impl TaxDocument {
    /// Strips punctuation and validates check digits.
    pub fn parse(input: &str) -> Result<Self, DocumentError> {
        let digits: Vec<u32> = input.chars().filter_map(|c| c.to_digit(10)).collect();
        let kind = match digits.len() {
            14 => DocumentKind::Cnpj,
            11 => DocumentKind::Cpf,
            n => return Err(DocumentError::WrongLength(n)),
        };
        if digits.iter().all(|d| *d == digits[0]) {
            return Err(DocumentError::RepeatedDigits);
        }

        let valid = match kind {
            DocumentKind::Cnpj => cnpj_check_digits(&digits[..12]) == (digits[12], digits[13]),
            DocumentKind::Cpf => cpf_check_digits(&digits[..9]) == (digits[9], digits[10]),
        };
        if !valid {
            return Err(DocumentError::CheckDigits(kind));
        }

        Ok(Self {
            kind,
            digits: digits.iter().filter_map(|d| char::from_digit(*d, 10)).collect(),
        })
    }

    /// CNPJ or CPF.
    #[must_use]
    pub const fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Digits only.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// `00.000.000/0000-00` or `000.000.000-00`.
    #[must_use]
    pub fn formatted(&self) -> String {
        let d = &self.digits;
        match self.kind {
            DocumentKind::Cnpj => format!(
                "{}.{}.{}/{}-{}",
                &d[0..2],
                &d[2..5],
                &d[5..8],
                &d[8..12],
                &d[12..14]
            ),
            DocumentKind::Cpf => {
                format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11])
            }
        }
    }
}

fn mod11_digit(sum: u32) -> u32 {
    match sum % 11 {
        0 | 1 => 0,
        r => 11 - r,
    }
}

fn weighted_sum(digits: &[u32], weights: impl Iterator<Item = u32>) -> u32 {
    digits.iter().zip(weights).map(|(d, w)| d * w).sum()
}

fn cnpj_weights(len: usize) -> impl Iterator<Item = u32> {
    // 5,4,3,2,9,8,7,6,5,4,3,2 for the first digit; 6,5,... for the second.
    let start = u32::try_from(len).unwrap_or(12) - 7;
    (2..=start).rev().chain((2..=9).rev())
}

fn cnpj_check_digits(base: &[u32]) -> (u32, u32) {
    let first = mod11_digit(weighted_sum(base, cnpj_weights(base.len())));
    let mut extended = base.to_vec();
    extended.push(first);
    let second = mod11_digit(weighted_sum(&extended, cnpj_weights(extended.len())));
    (first, second)
}

fn cpf_check_digits(base: &[u32]) -> (u32, u32) {
    let first = mod11_digit(weighted_sum(base, (2..=10).rev()));
    let mut extended = base.to_vec();
    extended.push(first);
    let second = mod11_digit(weighted_sum(&extended, (2..=11).rev()));
    (first, second)
}
