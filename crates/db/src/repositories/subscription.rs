//! Stripe billing state: received webhook events, customer links and
//! tenant subscriptions.

use chrono::{DateTime, Utc};
use contta_core::webhook::SubscriptionObject;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, Set, TryIntoModel,
};
use serde_json::Value as Json;
use uuid::Uuid;

use crate::entities::{stripe_customers, stripe_webhook_events, subscriptions};
use crate::rls::RlsConnection;

/// What the event log says about an incoming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventReceipt {
    /// First delivery.
    New,
    /// Seen before but never processed successfully.
    Retry,
    /// Already processed; acknowledge without side effects.
    AlreadyProcessed,
}

impl EventReceipt {
    /// Whether the event still has to be applied.
    #[must_use]
    pub const fn needs_processing(self) -> bool {
        !matches!(self, Self::AlreadyProcessed)
    }
}

fn from_unix(secs: Option<i64>) -> Option<DateTimeWithTimeZone> {
    secs.and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .map(Into::into)
}

/// Repository for Stripe state.
pub struct SubscriptionRepository {
    db: DatabaseConnection,
}

impl SubscriptionRepository {
    /// Creates a new subscription repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Logs an event, keyed by its id.
    pub async fn record_event(
        &self,
        event_id: &str,
        event_type: &str,
        payload: Json,
    ) -> Result<EventReceipt, DbErr> {
        if let Some(existing) = stripe_webhook_events::Entity::find_by_id(event_id.to_string())
            .one(&self.db)
            .await?
        {
            return Ok(if existing.processed_at.is_some() {
                EventReceipt::AlreadyProcessed
            } else {
                EventReceipt::Retry
            });
        }

        stripe_webhook_events::ActiveModel {
            event_id: Set(event_id.to_string()),
            event_type: Set(event_type.to_string()),
            tenant_id: Set(None),
            payload: Set(payload),
            processed_at: Set(None),
            error: Set(None),
            received_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await?;
        Ok(EventReceipt::New)
    }

    /// Marks an event processed.
    pub async fn mark_processed(
        &self,
        event_id: &str,
        tenant_id: Option<Uuid>,
    ) -> Result<(), DbErr> {
        let Some(event) = stripe_webhook_events::Entity::find_by_id(event_id.to_string())
            .one(&self.db)
            .await?
        else {
            return Ok(());
        };
        let mut active = event.into_active_model();
        active.tenant_id = Set(tenant_id);
        active.processed_at = Set(Some(Utc::now().into()));
        active.error = Set(None);
        active.update(&self.db).await?;
        Ok(())
    }

    /// Stores the failure of an event so a redelivery retries it.
    pub async fn mark_failed(&self, event_id: &str, error: &str) -> Result<(), DbErr> {
        let Some(event) = stripe_webhook_events::Entity::find_by_id(event_id.to_string())
            .one(&self.db)
            .await?
        else {
            return Ok(());
        };
        let mut active = event.into_active_model();
        active.error = Set(Some(error.to_string()));
        active.update(&self.db).await?;
        Ok(())
    }

    /// Tenant linked to a Stripe customer.
    pub async fn tenant_for_customer(&self, customer_id: &str) -> Result<Option<Uuid>, DbErr> {
        Ok(stripe_customers::Entity::find_by_id(customer_id.to_string())
            .one(&self.db)
            .await?
            .map(|c| c.tenant_id))
    }

    /// Links a customer to a tenant. An existing link is kept.
    pub async fn link_customer(&self, customer_id: &str, tenant_id: Uuid) -> Result<(), DbErr> {
        if self.tenant_for_customer(customer_id).await?.is_some() {
            return Ok(());
        }
        stripe_customers::ActiveModel {
            stripe_customer_id: Set(customer_id.to_string()),
            tenant_id: Set(tenant_id),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await?;
        Ok(())
    }

    /// Inserts or refreshes the tenant's copy of a subscription.
    pub async fn upsert_subscription(
        &self,
        tenant_id: Uuid,
        subscription: &SubscriptionObject,
    ) -> Result<subscriptions::Model, DbErr> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let txn = rls.transaction();
        let now: DateTimeWithTimeZone = Utc::now().into();

        let existing = subscriptions::Entity::find()
            .filter(subscriptions::Column::StripeSubscriptionId.eq(subscription.id.as_str()))
            .one(txn)
            .await?;

        let mut active = match existing {
            Some(row) => row.into_active_model(),
            None => subscriptions::ActiveModel {
                id: Set(Uuid::now_v7()),
                tenant_id: Set(tenant_id),
                stripe_subscription_id: Set(subscription.id.clone()),
                created_at: Set(now),
                ..Default::default()
            },
        };
        active.stripe_customer_id = Set(subscription.customer.clone());
        active.status = Set(subscription.mapped_status());
        active.plan = Set(subscription.plan().map(str::to_string));
        active.current_period_start = Set(from_unix(subscription.current_period_start));
        active.current_period_end = Set(from_unix(subscription.current_period_end));
        active.cancel_at_period_end = Set(subscription.cancel_at_period_end);
        active.updated_at = Set(now);
        let row = active.save(txn).await?.try_into_model()?;

        rls.commit().await?;
        tracing::info!(
            tenant_id = %tenant_id,
            subscription = %subscription.id,
            status = %row.status,
            "Subscription saved"
        );
        Ok(row)
    }

    /// Changes the status of a known subscription. Returns `false` when the
    /// tenant has no such subscription.
    pub async fn set_status(
        &self,
        tenant_id: Uuid,
        stripe_subscription_id: &str,
        status: &str,
    ) -> Result<bool, DbErr> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let txn = rls.transaction();

        let Some(row) = subscriptions::Entity::find()
            .filter(subscriptions::Column::TenantId.eq(tenant_id))
            .filter(subscriptions::Column::StripeSubscriptionId.eq(stripe_subscription_id))
            .one(txn)
            .await?
        else {
            rls.rollback().await?;
            return Ok(false);
        };

        let mut active = row.into_active_model();
        active.status = Set(status.to_string());
        active.updated_at = Set(Utc::now().into());
        active.update(txn).await?;

        rls.commit().await?;
        tracing::info!(
            tenant_id = %tenant_id,
            subscription = %stripe_subscription_id,
            status = %status,
            "Subscription status changed"
        );
        Ok(true)
    }
}
