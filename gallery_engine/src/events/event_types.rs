use serde::{Deserialize, Serialize};

use crate::{db_types::Order, order_objects::PaidOrderSummary};

/// Published at most once per payment session, by the reconciliation call that actually performed the `Paid`
/// transition. Carries the fully joined summary so handlers need no database access of their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub summary: PaidOrderSummary,
}

impl OrderPaidEvent {
    pub fn new(summary: PaidOrderSummary) -> Self {
        Self { summary }
    }
}

/// Published when an order's shipping status transitions into `Shipped` (from any other status). Re-saving an
/// already shipped order does not republish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderShippedEvent {
    pub order: Order,
}

impl OrderShippedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}
