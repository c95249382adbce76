//! The behaviour that a storage backend must provide to act as a backend for the gallery payment server.
//! SQLite is the only backend currently shipped ([`crate::SqliteDatabase`]), but all order-flow logic is written
//! against these traits so that tests and future backends can substitute their own implementations.

mod catalog_management;
mod order_management;
mod storefront_database;

pub use catalog_management::CatalogManagement;
pub use order_management::OrderManagement;
pub use storefront_database::{ReconcileOutcome, StorefrontDatabase, StorefrontError};
