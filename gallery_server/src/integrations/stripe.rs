//! Glue between the HTTP surface and the payment provider.
//!
//! Outbound: [`build_checkout_session`] turns a validated cart into session-creation parameters.
//! Inbound: [`settle_checkout_session`] re-fetches a completed session from the provider and derives the
//! [`NewOrder`] that the reconciler persists. The provider's records are the only source of truth on this path;
//! nothing from the original cart payload is consulted.

use gallery_common::Cents;
use gallery_engine::db_types::{NewOrder, NewOrderItem, SessionId};
use log::*;
use stripe_tools::{NewCheckoutSession, NewLineItem, ShippingTier, StripeApi, StripeApiError};
use thiserror::Error;

use crate::{
    config::CheckoutConfig,
    data_objects::CheckoutRequest,
    errors::CheckoutError,
};

/// Prices below this are taken to be major units (euros) and scaled to cents; anything at or above it is assumed
/// to already be in cents. This heuristic exists only at this boundary: every amount past it is strictly cents.
const MAJOR_UNIT_THRESHOLD: f64 = 1000.0;

/// Normalize a client-supplied price to minor units.
pub fn normalize_price(price: f64) -> Cents {
    let cents = if price < MAJOR_UNIT_THRESHOLD { (price * 100.0).round() } else { price.round() };
    Cents::from(cents as i64)
}

/// Validate a cart and produce the provider session parameters: one line item per cart line with the catalog ids
/// embedded as metadata, the two fixed shipping tiers, and the destination-country allow-list.
pub fn build_checkout_session(
    request: CheckoutRequest,
    options: &CheckoutConfig,
) -> Result<NewCheckoutSession, CheckoutError> {
    if request.items.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    let mut line_items = Vec::with_capacity(request.items.len());
    for line in &request.items {
        let unit_amount = normalize_price(line.price);
        if !unit_amount.is_positive() {
            debug!("🛒️ Rejecting cart line for work #{}: normalized price is {unit_amount}", line.work_id);
            return Err(CheckoutError::InvalidPrice);
        }
        if line.qty < 1 {
            debug!("🛒️ Rejecting cart line for work #{}: quantity is {}", line.work_id, line.qty);
            return Err(CheckoutError::InvalidQuantity);
        }
        let name = match &line.artist_name {
            Some(artist) => format!("{} — {artist}", line.title),
            None => line.title.clone(),
        };
        line_items.push(NewLineItem {
            name,
            image: line.image.clone(),
            unit_amount,
            quantity: line.qty,
            work_id: line.work_id,
            variant_id: line.variant_id,
        });
    }
    Ok(NewCheckoutSession {
        line_items,
        customer_email: request.email,
        success_url: options.success_url.clone(),
        cancel_url: options.cancel_url.clone(),
        shipping_options: vec![
            ShippingTier { label: "Standard".to_string(), amount: options.standard_shipping },
            ShippingTier { label: "Express".to_string(), amount: options.express_shipping },
        ],
        allowed_countries: options.allowed_countries.clone(),
    })
}

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Could not fetch the session from the payment provider. {0}")]
    ProviderError(#[from] StripeApiError),
}

/// Fetch a completed session and its line items from the provider and derive the reconciler input.
///
/// Line items that cannot be tied back to the catalog (no work id in the product metadata) or that carry a
/// non-positive quantity or price are dropped into the returned `missing` report; they never block the order.
pub async fn settle_checkout_session(
    session_id: &str,
    api: &StripeApi,
) -> Result<(NewOrder, Vec<String>), SettlementError> {
    let session = api.fetch_checkout_session(session_id).await?;
    let line_items = api.fetch_session_line_items(session_id).await?;
    let mut items = Vec::with_capacity(line_items.len());
    let mut missing = Vec::new();
    for line in &line_items {
        let quantity = line.quantity.unwrap_or(0);
        let unit_price = line.unit_amount().unwrap_or(0);
        let work_id = line.product_metadata("work_id").and_then(|s| s.parse::<i64>().ok());
        match work_id {
            None => {
                warn!("🛒️ Line item {} of session {session_id} carries no resolvable work id", line.id);
                missing.push(format!("line item {} carries no resolvable work id", line.id));
            },
            Some(_) if quantity <= 0 => {
                missing.push(format!("line item {} has a non-positive quantity ({quantity})", line.id));
            },
            Some(_) if unit_price <= 0 => {
                missing.push(format!("line item {} has a non-positive unit price ({unit_price})", line.id));
            },
            Some(work_id) => {
                let variant_id = line.product_metadata("variant_id").and_then(|s| s.parse::<i64>().ok());
                items.push(NewOrderItem { work_id, variant_id, quantity, unit_price: Cents::from(unit_price) });
            },
        }
    }
    let total = session
        .amount_total
        .map(Cents::from)
        .unwrap_or_else(|| items.iter().map(|i| i.unit_price * i.quantity).sum());
    let mut order = NewOrder::new(SessionId::from(session_id), total, items);
    if let Some(email) = session.buyer_email() {
        order = order.with_email(email);
    }
    if let Some(order_id) = session.metadata.get("order_id").and_then(|s| s.parse::<i64>().ok()) {
        order = order.with_metadata_order_id(order_id);
    }
    Ok((order, missing))
}

#[cfg(test)]
mod test {
    use crate::data_objects::CartLine;

    use super::*;

    fn cart_line(price: f64, qty: i64) -> CartLine {
        CartLine {
            work_id: 1,
            variant_id: Some(1),
            title: "Dune Study II".to_string(),
            artist_name: Some("Mara Voss".to_string()),
            image: None,
            price,
            qty,
        }
    }

    #[test]
    fn prices_below_the_threshold_are_major_units() {
        assert_eq!(normalize_price(45.0), Cents::from(4500));
        assert_eq!(normalize_price(999.99), Cents::from(99999));
        assert_eq!(normalize_price(1000.0), Cents::from(1000));
        assert_eq!(normalize_price(4500.0), Cents::from(4500));
    }

    #[test]
    fn empty_carts_are_rejected() {
        let request = CheckoutRequest { items: vec![], email: None };
        assert!(matches!(build_checkout_session(request, &CheckoutConfig::default()), Err(CheckoutError::EmptyCart)));
    }

    #[test]
    fn non_positive_prices_are_rejected() {
        let request = CheckoutRequest { items: vec![cart_line(0.0, 1)], email: None };
        assert!(matches!(
            build_checkout_session(request, &CheckoutConfig::default()),
            Err(CheckoutError::InvalidPrice)
        ));
        let request = CheckoutRequest { items: vec![cart_line(-45.0, 1)], email: None };
        assert!(matches!(
            build_checkout_session(request, &CheckoutConfig::default()),
            Err(CheckoutError::InvalidPrice)
        ));
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        let request = CheckoutRequest { items: vec![cart_line(45.0, 0)], email: None };
        assert!(matches!(
            build_checkout_session(request, &CheckoutConfig::default()),
            Err(CheckoutError::InvalidQuantity)
        ));
    }

    #[test]
    fn a_euro_cart_becomes_cent_line_items() {
        let request = CheckoutRequest { items: vec![cart_line(45.0, 2)], email: Some("b@example.com".to_string()) };
        let session = build_checkout_session(request, &CheckoutConfig::default()).unwrap();
        assert_eq!(session.line_items.len(), 1);
        let item = &session.line_items[0];
        assert_eq!(item.unit_amount, Cents::from(4500));
        assert_eq!(item.quantity, 2);
        assert_eq!(item.work_id, 1);
        assert_eq!(item.variant_id, Some(1));
        assert_eq!(item.name, "Dune Study II — Mara Voss");
        assert_eq!(session.customer_email.as_deref(), Some("b@example.com"));
        assert_eq!(session.shipping_options.len(), 2);
        assert!(!session.allowed_countries.is_empty());
    }
}
