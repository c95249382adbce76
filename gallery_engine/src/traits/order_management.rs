use crate::{
    db_types::{Order, OrderItem, OrderUpdate, SessionId},
    order_objects::{OrderQueryFilter, PaidOrderSummary},
    traits::StorefrontError,
};

/// Order queries and updates used by the admin/author dashboards and the notification fan-out.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, StorefrontError>;

    async fn fetch_order_by_session_id(&self, session_id: &SessionId) -> Result<Option<Order>, StorefrontError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, StorefrontError>;

    /// Fetch orders matching the filter, most recent first by the requested sort key.
    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, StorefrontError>;

    /// Apply a partial update to an order. Returns the order as it was before and after the update, so that
    /// callers can detect transitions (e.g. into `Shipped`). Fails with [`StorefrontError::EmptyUpdate`] when the
    /// update carries no fields and [`StorefrontError::OrderNotFound`] when the order does not exist.
    async fn update_order(&self, id: i64, update: OrderUpdate) -> Result<(Order, Order), StorefrontError>;

    /// The order with its items joined against works, artists and variants. The `missing` report of the returned
    /// summary is empty; reconciliation fills it in from its own bookkeeping.
    async fn order_summary(&self, order_id: i64) -> Result<PaidOrderSummary, StorefrontError>;

    /// The distinct artist ids represented in an order's items. Used for author-scope authorization.
    async fn artist_ids_for_order(&self, order_id: i64) -> Result<Vec<i64>, StorefrontError>;
}
