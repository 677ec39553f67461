//! Gateway errors.

use contta_core::classification::AdvisorError;
use thiserror::Error;

/// Errors talking to the AI gateway.
#[derive(Debug, Error)]
pub enum AiError {
    /// The HTTP client could not be built.
    #[error("Invalid gateway configuration: {0}")]
    Config(String),

    /// Transport failure (connect, timeout, TLS).
    #[error("Gateway request failed: {0}")]
    Network(String),

    /// Non-success status.
    #[error("Gateway answered {status}: {body}")]
    Status {
        /// HTTP status.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The reply was not what we asked for.
    #[error("Unusable gateway response: {0}")]
    InvalidResponse(String),
}

impl AiError {
    /// 429, 5xx and transport failures are retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Config(_) | Self::InvalidResponse(_) => false,
        }
    }
}

impl From<AiError> for AdvisorError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::InvalidResponse(msg) => Self::InvalidResponse(msg),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(AiError::Network("reset".into()).is_retryable());
        assert!(AiError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(AiError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(!AiError::Status { status: 401, body: String::new() }.is_retryable());
        assert!(!AiError::InvalidResponse("x".into()).is_retryable());
    }

    #[test]
    fn test_into_advisor_error() {
        assert_eq!(
            AdvisorError::from(AiError::InvalidResponse("no json".into())),
            AdvisorError::InvalidResponse("no json".into())
        );
        assert!(matches!(
            AdvisorError::from(AiError::Network("timeout".into())),
            AdvisorError::Unavailable(_)
        ));
    }
}
