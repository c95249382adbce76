use std::{fmt::Display, str::FromStr};

use gallery_common::Cents;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db_types::{Order, OrderStatus, ShippingStatus, StatusConversionError};

pub const DEFAULT_QUERY_LIMIT: i64 = 50;
pub const MAX_QUERY_LIMIT: i64 = 500;

//--------------------------------------   OrderQueryFilter    --------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct OrderQueryFilter {
    pub status: Option<OrderStatus>,
    pub shipping_status: Option<ShippingStatus>,
    /// Restrict to orders containing at least one item by any of these artists. Empty means no restriction.
    #[serde(default)]
    pub artists: Vec<i64>,
    /// Free-text match against buyer email, session id and tracking URL.
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub sort: Option<SortKey>,
}

impl OrderQueryFilter {
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_shipping_status(mut self, status: ShippingStatus) -> Self {
        self.shipping_status = Some(status);
        self
    }

    pub fn with_artist_id(mut self, artist_id: i64) -> Self {
        self.artists.push(artist_id);
        self
    }

    pub fn with_artists(mut self, artists: Vec<i64>) -> Self {
        self.artists = artists;
        self
    }

    pub fn with_search(mut self, needle: impl Into<String>) -> Self {
        self.search = Some(needle.into());
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.shipping_status.is_none() && self.artists.is_empty() && self.search.is_none()
    }

    /// The effective row limit, clamped to [1, MAX_QUERY_LIMIT].
    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_QUERY_LIMIT).clamp(1, MAX_QUERY_LIMIT)
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "No filters.")?;
            return Ok(());
        }
        if let Some(status) = &self.status {
            write!(f, "status: {status}. ")?;
        }
        if let Some(shipping) = &self.shipping_status {
            write!(f, "shipping: {shipping}. ")?;
        }
        if !self.artists.is_empty() {
            let ids = self.artists.iter().map(|id| format!("#{id}")).collect::<Vec<_>>().join(", ");
            write!(f, "artists: {ids}. ")?;
        }
        if let Some(search) = &self.search {
            write!(f, "search: '{search}'. ")?;
        }
        Ok(())
    }
}

//--------------------------------------       SortKey         --------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedAt,
    UpdatedAt,
    Total,
}

impl SortKey {
    /// The column name used in ORDER BY clauses. Values are fixed here; user input never reaches the SQL text.
    pub fn as_column(&self) -> &'static str {
        match self {
            SortKey::CreatedAt => "created_at",
            SortKey::UpdatedAt => "updated_at",
            SortKey::Total => "total",
        }
    }
}

impl FromStr for SortKey {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "created_at" => Ok(Self::CreatedAt),
            "updated_at" => Ok(Self::UpdatedAt),
            "total" => Ok(Self::Total),
            s => Err(StatusConversionError(format!("Invalid sort key: {s}"))),
        }
    }
}

//--------------------------------------      OrderResult      --------------------------------------------------------
/// The admin/author order listing payload: the matching orders plus the set of shipping statuses the dashboards
/// offer in their filter dropdowns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResult {
    pub orders: Vec<Order>,
    pub shipping_statuses: Vec<ShippingStatus>,
}

impl OrderResult {
    pub fn new(orders: Vec<Order>) -> Self {
        Self { orders, shipping_statuses: ShippingStatus::all().to_vec() }
    }
}

//--------------------------------------      ItemLine         --------------------------------------------------------
/// One order item joined with its work, artist and variant context. This is what the notification fan-out works
/// from: items are grouped by `artist_id` and routed to `contact_email`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemLine {
    pub work_id: i64,
    pub work_title: String,
    pub artist_id: i64,
    pub artist_name: String,
    pub contact_email: Option<String>,
    pub variant_label: Option<String>,
    pub quantity: i64,
    pub unit_price: Cents,
}

impl ItemLine {
    pub fn line_total(&self) -> Cents {
        self.unit_price * self.quantity
    }
}

//--------------------------------------   PaidOrderSummary    --------------------------------------------------------
/// A reconciled order with its resolved item context and the report of line items that could not be resolved.
/// Carried by [`crate::events::OrderPaidEvent`] so that notification handlers need no further database access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidOrderSummary {
    pub order: Order,
    pub items: Vec<ItemLine>,
    /// Human-readable descriptions of line items dropped during reconciliation (unresolvable work or variant,
    /// bad quantity or price). Reported to the admin, never fatal.
    pub missing: Vec<String>,
}
