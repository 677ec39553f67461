//! Application-wide error types.
//!
//! Every handler failure ends up as one of these variants and is rendered as
//! `{"error": "<code>", "message": "<text>"}` with the matching HTTP status.

use serde::Serialize;
use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or invalid credentials.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (wrong tenant or role).
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request or input file.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Accounting rule violation (closed month, blocked closing, unbalanced entry).
    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    /// Conflict (duplicate document, evaluation out of date).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// AI gateway, payment processor or other third-party failure.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body returned for every error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Machine readable snake_case code.
    pub error: String,
    /// Human readable message.
    pub message: String,
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::BusinessRule(_) => 422,
            Self::Conflict(_) => 409,
            Self::ExternalService(_) => 502,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation_error",
            Self::BusinessRule(_) => "business_rule_violation",
            Self::Conflict(_) => "conflict",
            Self::Database(_) | Self::Internal(_) => "internal_error",
            Self::ExternalService(_) => "external_service_error",
        }
    }

    /// Builds the response body. Database and internal details are not leaked.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        let message = match self {
            Self::Database(_) | Self::Internal(_) => "An error occurred".to_string(),
            Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Validation(m)
            | Self::BusinessRule(m)
            | Self::Conflict(m)
            | Self::ExternalService(m) => m.clone(),
        };
        ErrorBody {
            error: self.error_code().to_string(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::Unauthorized(String::new()), 401, "unauthorized")]
    #[case(AppError::Forbidden(String::new()), 403, "forbidden")]
    #[case(AppError::NotFound(String::new()), 404, "not_found")]
    #[case(AppError::Validation(String::new()), 400, "validation_error")]
    #[case(AppError::BusinessRule(String::new()), 422, "business_rule_violation")]
    #[case(AppError::Conflict(String::new()), 409, "conflict")]
    #[case(AppError::Database(String::new()), 500, "internal_error")]
    #[case(AppError::ExternalService(String::new()), 502, "external_service_error")]
    #[case(AppError::Internal(String::new()), 500, "internal_error")]
    fn test_status_and_code(#[case] err: AppError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AppError::Conflict("client already exists".into()).to_string(),
            "Conflict: client already exists"
        );
        assert_eq!(
            AppError::BusinessRule("period 2025-01 is closed".into()).to_string(),
            "Business rule violation: period 2025-01 is closed"
        );
    }

    #[test]
    fn test_body_hides_database_details() {
        let body = AppError::Database("relation \"clients\" does not exist".into()).body();
        assert_eq!(body.error, "internal_error");
        assert_eq!(body.message, "An error occurred");

        let body = AppError::Validation("invalid CNPJ".into()).body();
        assert_eq!(body.error, "validation_error");
        assert_eq!(body.message, "invalid CNPJ");
    }
}
