use log::*;

use crate::{
    db_types::{Order, OrderItem, SessionId},
    order_objects::{OrderQueryFilter, PaidOrderSummary},
    traits::{OrderManagement, StorefrontError},
};

/// Read-only order queries for the admin and author dashboards.
#[derive(Debug, Clone)]
pub struct OrdersApi<B> {
    db: B,
}

impl<B> OrdersApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrdersApi<B>
where B: OrderManagement
{
    pub async fn fetch_order(&self, id: i64) -> Result<Option<Order>, StorefrontError> {
        self.db.fetch_order_by_id(id).await
    }

    pub async fn fetch_order_by_session_id(&self, session_id: &SessionId) -> Result<Option<Order>, StorefrontError> {
        self.db.fetch_order_by_session_id(session_id).await
    }

    pub async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, StorefrontError> {
        self.db.fetch_order_items(order_id).await
    }

    pub async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, StorefrontError> {
        trace!("📄️ Order search: {filter}");
        self.db.search_orders(filter).await
    }

    pub async fn order_summary(&self, order_id: i64) -> Result<PaidOrderSummary, StorefrontError> {
        self.db.order_summary(order_id).await
    }

    pub async fn artist_ids_for_order(&self, order_id: i64) -> Result<Vec<i64>, StorefrontError> {
        self.db.artist_ids_for_order(order_id).await
    }
}
