use std::collections::HashMap;

use gallery_common::{Cents, STORE_CURRENCY_CODE_LOWER};
use serde::{Deserialize, Serialize};

//--------------------------------------  Checkout session creation  --------------------------------------------------

/// Parameters for a new hosted Checkout Session. Converted to Stripe's bracketed form-encoding by
/// [`NewCheckoutSession::to_form`].
#[derive(Debug, Clone, Default)]
pub struct NewCheckoutSession {
    pub line_items: Vec<NewLineItem>,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    pub shipping_options: Vec<ShippingTier>,
    pub allowed_countries: Vec<String>,
}

/// One priced cart line. `work_id`/`variant_id` are embedded as product metadata; that metadata round-trip is the
/// only linkage between the cart and the order that reconciliation eventually persists.
#[derive(Debug, Clone)]
pub struct NewLineItem {
    pub name: String,
    pub image: Option<String>,
    pub unit_amount: Cents,
    pub quantity: i64,
    pub work_id: i64,
    pub variant_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingTier {
    pub label: String,
    pub amount: Cents,
}

impl NewCheckoutSession {
    /// Render the session as `(key, value)` form pairs using Stripe's bracketed key syntax, e.g.
    /// `line_items[0][price_data][unit_amount]`.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ];
        if let Some(email) = &self.customer_email {
            form.push(("customer_email".to_string(), email.clone()));
        }
        for (i, item) in self.line_items.iter().enumerate() {
            let prefix = format!("line_items[{i}]");
            form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
            form.push((format!("{prefix}[price_data][currency]"), STORE_CURRENCY_CODE_LOWER.to_string()));
            form.push((format!("{prefix}[price_data][unit_amount]"), item.unit_amount.value().to_string()));
            form.push((format!("{prefix}[price_data][product_data][name]"), item.name.clone()));
            if let Some(image) = &item.image {
                form.push((format!("{prefix}[price_data][product_data][images][0]"), image.clone()));
            }
            form.push((format!("{prefix}[price_data][product_data][metadata][work_id]"), item.work_id.to_string()));
            if let Some(variant_id) = item.variant_id {
                form.push((
                    format!("{prefix}[price_data][product_data][metadata][variant_id]"),
                    variant_id.to_string(),
                ));
            }
        }
        for (i, country) in self.allowed_countries.iter().enumerate() {
            form.push((format!("shipping_address_collection[allowed_countries][{i}]"), country.clone()));
        }
        for (i, tier) in self.shipping_options.iter().enumerate() {
            let prefix = format!("shipping_options[{i}][shipping_rate_data]");
            form.push((format!("{prefix}[type]"), "fixed_amount".to_string()));
            form.push((format!("{prefix}[display_name]"), tier.label.clone()));
            form.push((format!("{prefix}[fixed_amount][amount]"), tier.amount.value().to_string()));
            form.push((format!("{prefix}[fixed_amount][currency]"), STORE_CURRENCY_CODE_LOWER.to_string()));
        }
        form
    }
}

//--------------------------------------  Checkout session retrieval  -------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// The hosted checkout redirect URL. Present on freshly created sessions, absent once the session completes.
    pub url: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    pub amount_total: Option<i64>,
    pub customer_email: Option<String>,
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    /// The buyer email, preferring the post-payment customer details over the email the session was created with.
    pub fn buyer_email(&self) -> Option<String> {
        self.customer_details.as_ref().and_then(|d| d.email.clone()).or_else(|| self.customer_email.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
}

//--------------------------------------       Line items        ------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemList {
    pub data: Vec<LineItem>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub quantity: Option<i64>,
    pub description: Option<String>,
    pub price: Option<Price>,
}

impl LineItem {
    pub fn unit_amount(&self) -> Option<i64> {
        self.price.as_ref().and_then(|p| p.unit_amount)
    }

    pub fn product_metadata(&self, key: &str) -> Option<&str> {
        self.price.as_ref().and_then(|p| p.product.as_ref()).and_then(|p| p.metadata.get(key)).map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Price {
    pub unit_amount: Option<i64>,
    pub currency: Option<String>,
    /// Only populated when the query expands `data.price.product`; the client always requests that expansion.
    pub product: Option<Product>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[cfg(test)]
mod test {
    use super::*;

    fn session() -> NewCheckoutSession {
        NewCheckoutSession {
            line_items: vec![NewLineItem {
                name: "Dune study II".to_string(),
                image: Some("https://img.example.com/dune.jpg".to_string()),
                unit_amount: Cents::from(4500),
                quantity: 2,
                work_id: 7,
                variant_id: Some(12),
            }],
            customer_email: Some("buyer@example.com".to_string()),
            success_url: "https://gallery.example.com/thanks".to_string(),
            cancel_url: "https://gallery.example.com/cart".to_string(),
            shipping_options: vec![
                ShippingTier { label: "Standard".to_string(), amount: Cents::from(650) },
                ShippingTier { label: "Express".to_string(), amount: Cents::from(1450) },
            ],
            allowed_countries: vec!["DE".to_string(), "NL".to_string()],
        }
    }

    #[test]
    fn form_encodes_line_items_with_metadata() {
        let form = session().to_form();
        let get = |k: &str| form.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("customer_email"), Some("buyer@example.com"));
        assert_eq!(get("line_items[0][quantity]"), Some("2"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("4500"));
        assert_eq!(get("line_items[0][price_data][currency]"), Some("eur"));
        assert_eq!(get("line_items[0][price_data][product_data][metadata][work_id]"), Some("7"));
        assert_eq!(get("line_items[0][price_data][product_data][metadata][variant_id]"), Some("12"));
    }

    #[test]
    fn form_encodes_shipping_tiers_and_countries() {
        let form = session().to_form();
        let get = |k: &str| form.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("shipping_address_collection[allowed_countries][1]"), Some("NL"));
        assert_eq!(get("shipping_options[0][shipping_rate_data][type]"), Some("fixed_amount"));
        assert_eq!(get("shipping_options[0][shipping_rate_data][display_name]"), Some("Standard"));
        assert_eq!(get("shipping_options[1][shipping_rate_data][fixed_amount][amount]"), Some("1450"));
    }

    #[test]
    fn line_item_metadata_lookup() {
        let raw = serde_json::json!({
            "id": "li_1",
            "quantity": 2,
            "description": "Dune study II",
            "price": {
                "unit_amount": 4500,
                "currency": "eur",
                "product": { "id": "prod_1", "name": "Dune study II", "metadata": { "work_id": "7", "variant_id": "12" } }
            }
        });
        let item: LineItem = serde_json::from_value(raw).unwrap();
        assert_eq!(item.unit_amount(), Some(4500));
        assert_eq!(item.product_metadata("work_id"), Some("7"));
        assert_eq!(item.product_metadata("variant_id"), Some("12"));
        assert_eq!(item.product_metadata("missing"), None);
    }
}
