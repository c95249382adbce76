//! Gallery Payment Engine
//!
//! The engine contains the storage backend and core order-flow logic for the gallery payment server. It is
//! web-framework agnostic: the HTTP layer lives in `gallery_server`, and provider integration in `stripe_tools`.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@db`]). SQLite is the supported backend. You should never need to
//!    access the database directly; use the public APIs instead. The exception is the data types used in the
//!    database, which are defined in [`db_types`] and are public.
//! 2. The engine public API ([`OrderFlowApi`] and [`OrdersApi`]). The former handles the state-changing flows
//!    (reconciling completed payment sessions, dashboard updates), the latter the read-only queries. Backends
//!    implement the traits in [`traits`] to power these APIs.
//! 3. The event system ([`events`]). `Paid` and `Shipped` transitions are published to registered hooks over an
//!    mpsc channel, so side effects such as notification emails run off the request path.

mod db;
mod gpe_api;

pub mod db_types;
pub mod events;
pub mod order_objects;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use gpe_api::{errors::OrderFlowError, order_flow_api::OrderFlowApi, orders_api::OrdersApi};
pub use traits::{CatalogManagement, OrderManagement, ReconcileOutcome, StorefrontDatabase, StorefrontError};
