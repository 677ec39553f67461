//! Stripe billing webhooks.

pub mod error;
pub mod event;
pub mod signature;

pub use error::WebhookError;
pub use event::{
    EventData, StripeEvent, SubscriptionObject, WebhookAction, map_subscription_status,
};
pub use signature::{DEFAULT_TOLERANCE_SECS, sign, verify_signature};
