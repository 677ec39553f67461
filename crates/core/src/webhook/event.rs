//! Stripe events and what they mean for a tenant's subscription.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::WebhookError;

/// The envelope of every Stripe event.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Event id (`evt_...`), unique per event.
    pub id: String,
    /// Dotted event type.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event payload.
    pub data: EventData,
}

/// `data` of an event.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EventData {
    /// The affected object (subscription, invoice, session...).
    pub object: Value,
}

impl StripeEvent {
    /// Parses a raw webhook body.
    pub fn parse(payload: &str) -> Result<Self, WebhookError> {
        serde_json::from_str(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
    }

    /// `object.customer` when it is a plain id.
    #[must_use]
    pub fn customer_id(&self) -> Option<&str> {
        self.data.object.get("customer").and_then(Value::as_str)
    }

    /// `object.metadata.tenant_id`.
    #[must_use]
    pub fn metadata_tenant_id(&self) -> Option<&str> {
        self.data
            .object
            .get("metadata")
            .and_then(|m| m.get("tenant_id"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// What the event asks us to do.
    pub fn action(&self) -> Result<WebhookAction, WebhookError> {
        let object = &self.data.object;
        match self.event_type.as_str() {
            "customer.subscription.created" | "customer.subscription.updated" => {
                let subscription: SubscriptionObject = serde_json::from_value(object.clone())
                    .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;
                Ok(WebhookAction::UpsertSubscription(subscription))
            }
            "customer.subscription.deleted" => Ok(WebhookAction::SetStatus {
                subscription_id: str_field(object, "id")?,
                status: "canceled".to_string(),
            }),
            "invoice.paid" => Ok(WebhookAction::SetStatus {
                subscription_id: str_field(object, "subscription")?,
                status: "active".to_string(),
            }),
            "invoice.payment_failed" => Ok(WebhookAction::SetStatus {
                subscription_id: str_field(object, "subscription")?,
                status: "past_due".to_string(),
            }),
            _ => Ok(WebhookAction::Ignore),
        }
    }
}

fn str_field(object: &Value, field: &str) -> Result<String, WebhookError> {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| WebhookError::InvalidPayload(format!("missing {field}")))
}

/// The fields of a Stripe subscription we keep.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SubscriptionObject {
    /// `sub_...`.
    pub id: String,
    /// `cus_...`.
    pub customer: String,
    /// Stripe status.
    pub status: String,
    /// Start of the current period (unix seconds).
    #[serde(default)]
    pub current_period_start: Option<i64>,
    /// End of the current period (unix seconds).
    #[serde(default)]
    pub current_period_end: Option<i64>,
    /// Whether it ends with the current period.
    #[serde(default)]
    pub cancel_at_period_end: bool,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, String>,
}

impl SubscriptionObject {
    /// Our status for the Stripe status.
    #[must_use]
    pub fn mapped_status(&self) -> String {
        map_subscription_status(&self.status)
    }

    /// `metadata.plan`.
    #[must_use]
    pub fn plan(&self) -> Option<&str> {
        self.metadata.get("plan").map(String::as_str)
    }
}

/// Side effect requested by an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAction {
    /// Insert or update the subscription row.
    UpsertSubscription(SubscriptionObject),
    /// Change the status of a known subscription.
    SetStatus {
        /// `sub_...`.
        subscription_id: String,
        /// New status.
        status: String,
    },
    /// Logged only.
    Ignore,
}

/// Maps a Stripe subscription status onto ours. Unknown values pass through.
#[must_use]
pub fn map_subscription_status(status: &str) -> String {
    match status {
        "active" => "active",
        "past_due" | "unpaid" => "past_due",
        "canceled" | "incomplete_expired" => "canceled",
        "incomplete" => "incomplete",
        "trialing" => "trialing",
        "paused" => "paused",
        other => other,
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("active", "active")]
    #[case("past_due", "past_due")]
    #[case("unpaid", "past_due")]
    #[case("canceled", "canceled")]
    #[case("incomplete_expired", "canceled")]
    #[case("incomplete", "incomplete")]
    #[case("trialing", "trialing")]
    #[case("paused", "paused")]
    #[case("something_new", "something_new")]
    fn test_status_map(#[case] stripe: &str, #[case] ours: &str) {
        assert_eq!(map_subscription_status(stripe), ours);
    }

    #[test]
    fn test_subscription_updated() {
        let event = StripeEvent::parse(
            r#"{"id":"evt_1","type":"customer.subscription.updated","data":{"object":{
                "id":"sub_1","customer":"cus_9","status":"unpaid",
                "current_period_end":1738368000,
                "metadata":{"tenant_id":"0192f0c1-0000-7000-8000-000000000001","plan":"pro"}}}}"#,
        )
        .unwrap();

        assert_eq!(event.customer_id(), Some("cus_9"));
        assert_eq!(
            event.metadata_tenant_id(),
            Some("0192f0c1-0000-7000-8000-000000000001")
        );
        let WebhookAction::UpsertSubscription(sub) = event.action().unwrap() else {
            panic!("expected upsert");
        };
        assert_eq!(sub.mapped_status(), "past_due");
        assert_eq!(sub.plan(), Some("pro"));
        assert_eq!(sub.current_period_end, Some(1_738_368_000));
    }

    #[test]
    fn test_invoice_events() {
        let paid = StripeEvent::parse(
            r#"{"id":"evt_2","type":"invoice.paid","data":{"object":{"subscription":"sub_1","customer":"cus_9"}}}"#,
        )
        .unwrap();
        assert_eq!(
            paid.action().unwrap(),
            WebhookAction::SetStatus {
                subscription_id: "sub_1".to_string(),
                status: "active".to_string()
            }
        );
        assert_eq!(paid.metadata_tenant_id(), None);

        let other = StripeEvent::parse(
            r#"{"id":"evt_3","type":"charge.refunded","data":{"object":{}}}"#,
        )
        .unwrap();
        assert_eq!(other.action().unwrap(), WebhookAction::Ignore);
    }

    #[test]
    fn test_invalid_payload() {
        assert!(matches!(
            StripeEvent::parse("not json"),
            Err(WebhookError::InvalidPayload(_))
        ));
    }
}
