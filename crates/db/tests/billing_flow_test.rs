//! Stripe event log, customer links and subscription rows.

mod common;

use std::collections::HashMap;

use contta_core::webhook::SubscriptionObject;
use contta_db::repositories::{EventReceipt, SubscriptionRepository};
use uuid::Uuid;

fn subscription(id: &str, customer: &str, status: &str) -> SubscriptionObject {
    SubscriptionObject {
        id: id.to_string(),
        customer: customer.to_string(),
        status: status.to_string(),
        current_period_start: Some(1_738_368_000),
        current_period_end: Some(1_740_787_200),
        cancel_at_period_end: false,
        metadata: HashMap::from([("plan".to_string(), "pro".to_string())]),
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL with migrations applied"]
async fn test_upsert_subscription_inserts_then_refreshes() {
    let db = common::connect().await;
    let tenant = common::new_tenant(&db).await;
    let repo = SubscriptionRepository::new(db.clone());
    let sub_id = format!("sub_{}", Uuid::new_v4().simple());
    let customer = format!("cus_{}", Uuid::new_v4().simple());

    let created = repo
        .upsert_subscription(tenant, &subscription(&sub_id, &customer, "trialing"))
        .await
        .unwrap();
    assert_eq!(created.tenant_id, tenant);
    assert_eq!(created.status, "trialing");
    assert_eq!(created.plan.as_deref(), Some("pro"));
    assert!(created.current_period_start.is_some());

    let refreshed = repo
        .upsert_subscription(tenant, &subscription(&sub_id, &customer, "unpaid"))
        .await
        .unwrap();
    assert_eq!(refreshed.id, created.id);
    assert_eq!(refreshed.status, "past_due");

    assert!(repo.set_status(tenant, &sub_id, "canceled").await.unwrap());
    assert!(!repo.set_status(tenant, "sub_missing", "canceled").await.unwrap());
}

#[tokio::test]
#[ignore = "requires PostgreSQL with migrations applied"]
async fn test_event_log_tracks_processing() {
    let db = common::connect().await;
    let tenant = common::new_tenant(&db).await;
    let repo = SubscriptionRepository::new(db.clone());
    let event_id = format!("evt_{}", Uuid::new_v4().simple());
    let payload = serde_json::json!({ "id": event_id });

    let first = repo
        .record_event(&event_id, "customer.subscription.created", payload.clone())
        .await
        .unwrap();
    assert_eq!(first, EventReceipt::New);

    repo.mark_failed(&event_id, "tenant not found").await.unwrap();
    let retry = repo
        .record_event(&event_id, "customer.subscription.created", payload.clone())
        .await
        .unwrap();
    assert_eq!(retry, EventReceipt::Retry);

    repo.mark_processed(&event_id, Some(tenant)).await.unwrap();
    let again = repo
        .record_event(&event_id, "customer.subscription.created", payload)
        .await
        .unwrap();
    assert_eq!(again, EventReceipt::AlreadyProcessed);

    let customer = format!("cus_{}", Uuid::new_v4().simple());
    repo.link_customer(&customer, tenant).await.unwrap();
    assert_eq!(repo.tenant_for_customer(&customer).await.unwrap(), Some(tenant));
}
