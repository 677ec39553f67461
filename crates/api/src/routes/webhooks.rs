//! Stripe webhook endpoint. Authenticated by signature, not by token.

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use chrono::Utc;
use contta_core::webhook::{StripeEvent, WebhookAction, WebhookError, verify_signature};
use contta_db::SubscriptionRepository;
use contta_db::repositories::EventReceipt;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::AppState;
use crate::error::{ApiError, ApiResult};

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Creates the webhook routes. These are public.
pub fn routes() -> Router<AppState> {
    Router::new().route("/webhooks/stripe", post(stripe_webhook))
}

/// Acknowledgement sent back to Stripe.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    /// Always true.
    pub received: bool,
    /// The event had already been processed.
    pub duplicate: bool,
}

/// POST `/webhooks/stripe` - Applies a subscription event.
async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> ApiResult<Json<WebhookAck>> {
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;
    let stripe = &state.config.stripe;
    verify_signature(
        &body,
        header,
        &stripe.webhook_secret,
        stripe.tolerance_secs,
        Utc::now().timestamp(),
    )?;

    let event = StripeEvent::parse(&body)?;
    let payload = serde_json::from_str(&body)
        .map_err(|e| ApiError::from(WebhookError::InvalidPayload(e.to_string())))?;
    let repo = SubscriptionRepository::new((*state.db).clone());

    let receipt = repo
        .record_event(&event.id, &event.event_type, payload)
        .await?;
    if receipt == EventReceipt::AlreadyProcessed {
        info!(event_id = %event.id, "Duplicate webhook acknowledged");
        return Ok(Json(WebhookAck {
            received: true,
            duplicate: true,
        }));
    }

    match apply_event(&repo, &event).await {
        Ok(tenant_id) => {
            repo.mark_processed(&event.id, tenant_id).await?;
            info!(
                event_id = %event.id,
                event_type = %event.event_type,
                tenant_id = ?tenant_id,
                "Webhook processed"
            );
            Ok(Json(WebhookAck {
                received: true,
                duplicate: false,
            }))
        }
        Err(err) => {
            repo.mark_failed(&event.id, &err.to_string()).await?;
            Err(err)
        }
    }
}

/// Applies the event's action and returns the tenant it concerned.
async fn apply_event(
    repo: &SubscriptionRepository,
    event: &StripeEvent,
) -> ApiResult<Option<Uuid>> {
    let action = event.action()?;
    if action == WebhookAction::Ignore {
        return Ok(None);
    }

    let Some(tenant_id) = resolve_tenant(repo, event).await? else {
        warn!(
            event_id = %event.id,
            customer = ?event.customer_id(),
            "Webhook for an unknown customer"
        );
        return Ok(None);
    };

    match action {
        WebhookAction::UpsertSubscription(subscription) => {
            repo.upsert_subscription(tenant_id, &subscription).await?;
        }
        WebhookAction::SetStatus {
            subscription_id,
            status,
        } => {
            if !repo.set_status(tenant_id, &subscription_id, &status).await? {
                warn!(
                    tenant_id = %tenant_id,
                    subscription = %subscription_id,
                    "Status change for an unknown subscription"
                );
            }
        }
        WebhookAction::Ignore => {}
    }
    Ok(Some(tenant_id))
}

/// Metadata wins and links the customer; otherwise the stored link is used.
async fn resolve_tenant(
    repo: &SubscriptionRepository,
    event: &StripeEvent,
) -> ApiResult<Option<Uuid>> {
    let from_metadata = event
        .metadata_tenant_id()
        .map(|raw| {
            Uuid::parse_str(raw).map_err(|_| {
                ApiError::from(WebhookError::InvalidPayload(format!(
                    "invalid tenant_id metadata: {raw}"
                )))
            })
        })
        .transpose()?;

    match (from_metadata, event.customer_id()) {
        (Some(tenant_id), Some(customer)) => {
            repo.link_customer(customer, tenant_id).await?;
            Ok(Some(tenant_id))
        }
        (Some(tenant_id), None) => Ok(Some(tenant_id)),
        (None, Some(customer)) => Ok(repo.tenant_for_customer(customer).await?),
        (None, None) => Ok(None),
    }
}
