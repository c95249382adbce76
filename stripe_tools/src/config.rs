use gallery_common::Secret;
use log::*;

const DEFAULT_API_BASE: &str = "https://api.stripe.com/v1";
const DEFAULT_API_VERSION: &str = "2024-06-20";

#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Base URL for the Stripe REST API. Overridable so that tests can point the client at a local stub.
    pub api_base: String,
    pub api_version: String,
    pub secret_key: Secret<String>,
    /// The signing secret for webhook endpoints (`whsec_...`). When absent, webhook signature checks are skipped
    /// in development mode and fail closed otherwise.
    pub webhook_secret: Option<Secret<String>>,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            secret_key: Secret::default(),
            webhook_secret: None,
        }
    }
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_base = std::env::var("GPS_STRIPE_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let api_version = std::env::var("GPS_STRIPE_API_VERSION").unwrap_or_else(|_| {
            warn!("GPS_STRIPE_API_VERSION not set, using {DEFAULT_API_VERSION} as default");
            DEFAULT_API_VERSION.to_string()
        });
        let secret_key = Secret::new(std::env::var("GPS_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("GPS_STRIPE_SECRET_KEY not set, using (probably useless) default");
            "sk_test_00000000000000".to_string()
        }));
        let webhook_secret = std::env::var("GPS_STRIPE_WEBHOOK_SECRET").ok().map(Secret::new);
        if webhook_secret.is_none() {
            warn!("GPS_STRIPE_WEBHOOK_SECRET not set. Webhook signatures cannot be verified.");
        }
        Self { api_base, api_version, secret_key, webhook_secret }
    }
}
