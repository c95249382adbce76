use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use gallery_common::Cents;
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------     OrderStatus       --------------------------------------------------------
/// Payment status of an order.
///
/// `Pending → Paid` happens exactly once, via the reconciler on the first successful webhook delivery.
/// `Paid → Refunded | Cancelled` are explicit admin actions. No transition is reversible otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// The order row exists but no successful payment has been reconciled against it.
    Pending,
    /// The payment provider reported the session as completed and the order was reconciled.
    Paid,
    /// Cancelled by an admin.
    Cancelled,
    /// Refunded by an admin.
    Refunded,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "Pending"),
            OrderStatus::Paid => write!(f, "Paid"),
            OrderStatus::Cancelled => write!(f, "Cancelled"),
            OrderStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid status value: {0}")]
pub struct StatusConversionError(pub String);

impl FromStr for OrderStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            s => Err(StatusConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatus::Pending
        })
    }
}

//--------------------------------------    ShippingStatus     --------------------------------------------------------
/// Fulfilment status of an order. Set by admins and authors from their dashboards. Deliberately not monotonic:
/// a shipment can be moved back to `Packing` to correct a mistake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingStatus {
    Pending,
    Packing,
    Shipped,
    Delivered,
}

impl ShippingStatus {
    pub fn all() -> [ShippingStatus; 4] {
        [Self::Pending, Self::Packing, Self::Shipped, Self::Delivered]
    }
}

impl Display for ShippingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShippingStatus::Pending => write!(f, "Pending"),
            ShippingStatus::Packing => write!(f, "Packing"),
            ShippingStatus::Shipped => write!(f, "Shipped"),
            ShippingStatus::Delivered => write!(f, "Delivered"),
        }
    }
}

impl FromStr for ShippingStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "packing" => Ok(Self::Packing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            s => Err(StatusConversionError(format!("Invalid shipping status: {s}"))),
        }
    }
}

//--------------------------------------       SessionId       --------------------------------------------------------
/// The payment provider's checkout-session id (`cs_...`). One order may exist per session id; this is the
/// idempotency key for webhook redelivery.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl FromStr for SessionId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------        Order          --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub session_id: SessionId,
    pub email: Option<String>,
    pub total: Cents,
    pub status: OrderStatus,
    pub shipping_status: ShippingStatus,
    pub tracking_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      OrderItem        --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub work_id: i64,
    pub variant_id: Option<i64>,
    pub quantity: i64,
    /// Unit price in minor units, snapshotted at purchase time. Immutable after creation.
    pub unit_price: Cents,
}

//--------------------------------------       NewOrder        --------------------------------------------------------
/// Reconciler input, derived from the provider-side session and its line items. The provider is the source of
/// truth for the amounts; nothing in here originates from the client's cart payload.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub session_id: SessionId,
    /// Order id embedded in the session metadata, if any. Used as an idempotency fallback when no order carries
    /// the session id yet.
    pub metadata_order_id: Option<i64>,
    pub email: Option<String>,
    pub total: Cents,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    pub fn new(session_id: SessionId, total: Cents, items: Vec<NewOrderItem>) -> Self {
        Self { session_id, metadata_order_id: None, email: None, total, items }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_metadata_order_id(mut self, order_id: i64) -> Self {
        self.metadata_order_id = Some(order_id);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub work_id: i64,
    pub variant_id: Option<i64>,
    pub quantity: i64,
    pub unit_price: Cents,
}

//--------------------------------------      OrderUpdate      --------------------------------------------------------
/// A typed partial update for an order. Field-level optionality is encoded here rather than sniffed out of loose
/// JSON in the handlers; an empty update is rejected before it reaches the database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub shipping_status: Option<ShippingStatus>,
    pub tracking_url: Option<String>,
}

impl OrderUpdate {
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_shipping_status(mut self, status: ShippingStatus) -> Self {
        self.shipping_status = Some(status);
        self
    }

    pub fn with_tracking_url(mut self, url: impl Into<String>) -> Self {
        self.tracking_url = Some(url.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.shipping_status.is_none() && self.tracking_url.is_none()
    }
}

//--------------------------------------   Catalog entities    --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: i64,
    pub name: String,
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Work {
    pub id: i64,
    pub artist_id: i64,
    pub title: String,
    pub price: Cents,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: i64,
    pub work_id: i64,
    pub label: String,
    pub price: Cents,
}
