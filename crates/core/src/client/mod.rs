//! Client registration rules.

pub mod document;

use rust_decimal::Decimal;
use thiserror::Error;

pub use document::{DocumentError, DocumentKind, TaxDocument};

/// Errors validating client data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Name is blank.
    #[error("Client name is required")]
    EmptyName,

    /// Monthly fee below zero.
    #[error("Monthly fee cannot be negative")]
    NegativeFee,

    /// CNPJ/CPF rejected.
    #[error(transparent)]
    Document(#[from] DocumentError),
}

impl ClientError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyName => "empty_name",
            Self::NegativeFee => "negative_fee",
            Self::Document(_) => "invalid_document",
        }
    }
}

/// Client data after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidClient {
    /// Trimmed name.
    pub name: String,
    /// Digits-only document.
    pub document: TaxDocument,
    /// Contracted monthly fee.
    pub monthly_fee: Decimal,
}

/// Validates the fields required to register a client.
pub fn validate_client(
    name: &str,
    document: &str,
    monthly_fee: Decimal,
) -> Result<ValidClient, ClientError> {
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return Err(ClientError::EmptyName);
    }
    if monthly_fee < Decimal::ZERO {
        return Err(ClientError::NegativeFee);
    }
    Ok(ValidClient {
        name,
        document: TaxDocument::parse(document)?,
        monthly_fee,
    })
}
