//! Webhook errors.

use thiserror::Error;

/// Errors raised while authenticating or reading a webhook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// No `Stripe-Signature` header.
    #[error("Missing signature header")]
    MissingSignature,

    /// The header has no timestamp or no `v1` signature.
    #[error("Malformed signature header")]
    MalformedHeader,

    /// No signature matches the payload.
    #[error("Signature does not match payload")]
    SignatureMismatch,

    /// The signed timestamp is too old or too far in the future.
    #[error("Signature timestamp outside tolerance")]
    TimestampOutOfTolerance,

    /// The configured secret is unusable.
    #[error("Webhook secret is not configured")]
    InvalidSecret,

    /// The payload is not a Stripe event.
    #[error("Invalid event payload: {0}")]
    InvalidPayload(String),
}

impl WebhookError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingSignature => "missing_signature",
            Self::MalformedHeader | Self::SignatureMismatch | Self::TimestampOutOfTolerance => {
                "invalid_signature"
            }
            Self::InvalidSecret => "webhook_not_configured",
            Self::InvalidPayload(_) => "invalid_payload",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidSecret => 500,
            _ => 400,
        }
    }
}
