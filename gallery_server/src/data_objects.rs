use std::fmt::Display;

use gallery_engine::{
    db_types::{OrderStatus, OrderUpdate, ShippingStatus},
    order_objects::{OrderQueryFilter, SortKey},
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::Role,
    errors::ServerError,
};

//--------------------------------------     JsonResponse      --------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

//--------------------------------------       Checkout        --------------------------------------------------------
/// One cart line as submitted by the storefront client. Prices here are advisory only: they size the checkout
/// session, but the persisted order is always built from the provider's own records during reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub work_id: i64,
    #[serde(default)]
    pub variant_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub artist_name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// Either major units (euros) or minor units (cents); see the normalization rule at the cart boundary.
    pub price: f64,
    pub qty: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub email: Option<String>,
}

//--------------------------------------    Webhook events     --------------------------------------------------------
/// The slice of a provider webhook event that the server inspects. Everything else about the session is
/// re-fetched from the provider rather than trusted from the delivery payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEventData {
    pub object: WebhookObject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookObject {
    pub id: String,
}

//--------------------------------------   Order admin DTOs    --------------------------------------------------------
/// The PATCH body for order updates. `status` is accepted from admins only; authors are limited to fulfilment
/// fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderUpdateRequest {
    pub shipping_status: Option<ShippingStatus>,
    pub tracking_url: Option<String>,
    pub status: Option<OrderStatus>,
}

impl OrderUpdateRequest {
    pub fn into_update(self, role: Role) -> Result<OrderUpdate, ServerError> {
        if self.status.is_some() && role != Role::Admin {
            return Err(ServerError::InsufficientPermissions(
                "Only admins may change the payment status of an order.".to_string(),
            ));
        }
        Ok(OrderUpdate { status: self.status, shipping_status: self.shipping_status, tracking_url: self.tracking_url })
    }
}

/// Query parameters of the order listing endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQueryParams {
    pub status: Option<String>,
    pub shipping_status: Option<String>,
    pub artist_id: Option<i64>,
    /// Free-text search over email, session id and tracking URL.
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
}

impl OrderQueryParams {
    pub fn into_filter(self) -> Result<OrderQueryFilter, ServerError> {
        let mut filter = OrderQueryFilter::default();
        if let Some(status) = self.status {
            let status: OrderStatus =
                status.parse().map_err(|e| ServerError::InvalidRequestBody(format!("{e}")))?;
            filter = filter.with_status(status);
        }
        if let Some(shipping) = self.shipping_status {
            let shipping: ShippingStatus =
                shipping.parse().map_err(|e| ServerError::InvalidRequestBody(format!("{e}")))?;
            filter = filter.with_shipping_status(shipping);
        }
        if let Some(artist_id) = self.artist_id {
            filter = filter.with_artist_id(artist_id);
        }
        if let Some(q) = self.q {
            filter = filter.with_search(q);
        }
        if let Some(limit) = self.limit {
            filter = filter.with_limit(limit);
        }
        if let Some(sort) = self.sort {
            let sort: SortKey = sort.parse().map_err(|e| ServerError::InvalidRequestBody(format!("{e}")))?;
            filter = filter.with_sort(sort);
        }
        Ok(filter)
    }
}
