use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order},
    traits::{CatalogManagement, OrderManagement},
};

#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Order #{0} does not exist")]
    OrderNotFound(i64),
    #[error("The update contains no fields to apply")]
    EmptyUpdate,
}

/// The result of reconciling a completed payment session against the orders table.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// No order existed for the session; one was created with `Paid` status.
    Created(Order),
    /// An unpaid order existed (via the metadata fallback) and was transitioned to `Paid`.
    MarkedPaid(Order),
    /// The order was already `Paid`: a duplicate delivery. Nothing was mutated.
    AlreadyPaid(Order),
}

impl ReconcileOutcome {
    pub fn order(&self) -> &Order {
        match self {
            ReconcileOutcome::Created(o) | ReconcileOutcome::MarkedPaid(o) | ReconcileOutcome::AlreadyPaid(o) => o,
        }
    }

    /// True iff this call performed the `Paid` transition. Notification fan-out is gated on this, not on the
    /// mere existence of the order, which is what makes the paid side effect at-most-once under redelivery.
    pub fn transitioned(&self) -> bool {
        !matches!(self, ReconcileOutcome::AlreadyPaid(_))
    }
}

/// The top-level behaviour of a storage backend for the gallery payment server.
#[allow(async_fn_in_trait)]
pub trait StorefrontDatabase: Clone + OrderManagement + CatalogManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Atomically reconcile a completed payment session into a persisted order.
    ///
    /// In a single transaction:
    /// * Look up an existing order by session id, falling back to the metadata order id.
    /// * Already `Paid` → return [`ReconcileOutcome::AlreadyPaid`] without mutating anything.
    /// * Found but unpaid → set status to `Paid`, refresh total and email, claim the session id.
    /// * Not found → resolve every item against the catalog, dropping unresolvable ones into the returned
    ///   `missing` report, and insert the order (as `Paid`) plus its surviving items. The insert races on the
    ///   unique session-id column, so two overlapping deliveries cannot both create an order; the loser observes
    ///   the winner's row and reports `AlreadyPaid`.
    ///
    /// Partial application is never observable: either the transaction commits with the order and all its items,
    /// or nothing is written.
    async fn reconcile_paid_session(
        &self,
        order: NewOrder,
    ) -> Result<(ReconcileOutcome, Vec<String>), StorefrontError>;
}
