use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewOrder, Order, OrderUpdate, ShippingStatus},
    events::{EventProducers, OrderPaidEvent, OrderShippedEvent},
    gpe_api::errors::OrderFlowError,
    order_objects::PaidOrderSummary,
    traits::{ReconcileOutcome, StorefrontDatabase, StorefrontError},
};

/// `OrderFlowApi` is the primary API for the state-changing order flows: reconciling completed payment sessions
/// into persisted orders, and applying shipping/status updates from the dashboards. It owns the event producers,
/// so every `Paid` and `Shipped` transition it performs is announced to the registered hooks.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: StorefrontDatabase
{
    /// Reconcile a completed payment session into a persisted order.
    ///
    /// `provider_missing` carries the descriptions of line items that were already dropped while deriving the
    /// order from the provider session (no work id in the metadata, bad quantity or price); the database layer
    /// adds the items it drops during catalog resolution, and the merged report travels with the paid event.
    ///
    /// The `OrderPaidEvent` is published iff this call performed the `Paid` transition. Duplicate deliveries are
    /// answered without mutation and without a notification re-send, whatever the delivery count or interleaving.
    pub async fn process_paid_session(
        &self,
        order: NewOrder,
        provider_missing: Vec<String>,
    ) -> Result<ReconcileOutcome, OrderFlowError> {
        let session_id = order.session_id.clone();
        let (outcome, dropped) = self.db.reconcile_paid_session(order).await?;
        match &outcome {
            ReconcileOutcome::AlreadyPaid(order) => {
                info!(
                    "🔄️📦️ Session {session_id} was already reconciled as order #{}. Duplicate delivery ignored.",
                    order.id
                );
            },
            ReconcileOutcome::Created(order) | ReconcileOutcome::MarkedPaid(order) => {
                let mut summary = self.db.order_summary(order.id).await?;
                summary.missing = provider_missing;
                summary.missing.extend(dropped);
                debug!(
                    "🔄️📦️ Order #{} is paid: {} item line(s), {} dropped.",
                    order.id,
                    summary.items.len(),
                    summary.missing.len()
                );
                self.call_order_paid_hook(summary).await;
            },
        }
        Ok(outcome)
    }

    async fn call_order_paid_hook(&self, summary: PaidOrderSummary) {
        for producer in &self.producers.order_paid_producers {
            trace!("🔄️📦️ Notifying order paid hook subscribers");
            producer.publish_event(OrderPaidEvent::new(summary.clone())).await;
        }
    }

    /// Apply a partial update to an order from an admin/author dashboard.
    ///
    /// Shipping status is not constrained to move forward; dashboards are allowed to correct mistakes. The
    /// `OrderShippedEvent` is published exactly when the update moves the order *into* `Shipped` from any other
    /// status, so re-saving an already shipped order never re-notifies the buyer.
    pub async fn update_order(&self, id: i64, update: OrderUpdate) -> Result<Order, OrderFlowError> {
        if update.is_empty() {
            return Err(OrderFlowError::EmptyUpdate);
        }
        let (old, new) = self.db.update_order(id, update).await.map_err(|e| match e {
            StorefrontError::OrderNotFound(id) => OrderFlowError::OrderNotFound(id),
            StorefrontError::EmptyUpdate => OrderFlowError::EmptyUpdate,
            e => OrderFlowError::from(e),
        })?;
        if old.shipping_status != ShippingStatus::Shipped && new.shipping_status == ShippingStatus::Shipped {
            debug!("🔄️🚚️ Order #{} transitioned into Shipped", new.id);
            for producer in &self.producers.order_shipped_producers {
                producer.publish_event(OrderShippedEvent::new(new.clone())).await;
            }
        }
        Ok(new)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
