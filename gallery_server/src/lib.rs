//! # Gallery payment server
//! This module hosts the HTTP surface of the gallery storefront backend. It is responsible for:
//! Turning client carts into hosted checkout sessions at the payment provider.
//! Listening for incoming webhook deliveries from the payment provider and reconciling completed sessions into
//! persisted orders.
//! Serving the order listing/update endpoints behind the admin and author dashboards.
//! Fanning out notification emails for paid and shipped orders, off the request path.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/checkout`: Creates a provider-side checkout session from a cart and returns the redirect URL.
//! * `/stripe/webhook`: The signature-checked webhook route for payment provider events.
//! * `/api/orders`, `/api/my/orders`, `/api/orders/{id}`: Order administration for admins and authors.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

pub mod stripe_routes;

#[cfg(test)]
mod endpoint_tests;
