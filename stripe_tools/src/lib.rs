//! A thin client for the parts of the Stripe REST API that the gallery payment server uses:
//! creating Checkout Sessions, fetching a session and its line items back during webhook reconciliation, and
//! verifying `Stripe-Signature` headers on webhook deliveries.
//!
//! This is deliberately not a general-purpose Stripe SDK. Requests are form-encoded by hand (Stripe's bracketed
//! key syntax) and only the response fields the payment server consumes are modelled.

mod api;
mod config;
mod data_objects;
mod error;
mod signature;

pub use api::StripeApi;
pub use config::StripeConfig;
pub use data_objects::{
    CheckoutSession,
    CustomerDetails,
    LineItem,
    LineItemList,
    NewCheckoutSession,
    NewLineItem,
    Price,
    Product,
    ShippingTier,
};
pub use error::StripeApiError;
pub use signature::{signature_header, sign_payload, verify_signature_header, SignatureError, SIGNATURE_HEADER};
