use std::env;

use gallery_common::{helpers::parse_boolean_flag, Cents, Secret};
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use stripe_tools::StripeConfig;

const DEFAULT_GPS_HOST: &str = "127.0.0.1";
const DEFAULT_GPS_PORT: u16 = 8460;
const DEFAULT_SUCCESS_URL: &str = "http://localhost:3000/checkout/success";
const DEFAULT_CANCEL_URL: &str = "http://localhost:3000/cart";
const DEFAULT_ALLOWED_COUNTRIES: &str = "DE,AT,BE,NL,LU,FR,IT,ES,PT,DK,SE,FI,IE";
const DEFAULT_STANDARD_SHIPPING: i64 = 650;
const DEFAULT_EXPRESS_SHIPPING: i64 = 1450;
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 60;
const DEFAULT_RATE_LIMIT_BURST: u32 = 10;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// When false, webhook deliveries are accepted without a signature when no signing secret is configured.
    /// **DANGER** - only ever disable this on a local development instance.
    pub signature_checks: bool,
    /// Recipient of the per-order admin summary email. When unset, no admin summary is sent.
    pub admin_email: Option<String>,
    pub checkout: CheckoutConfig,
    pub rate_limit: RateLimitConfig,
    pub smtp: Option<SmtpConfig>,
    /// Payment provider configuration
    pub stripe_config: StripeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_GPS_HOST.to_string(),
            port: DEFAULT_GPS_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            signature_checks: true,
            admin_email: None,
            checkout: CheckoutConfig::default(),
            rate_limit: RateLimitConfig::default(),
            smtp: None,
            stripe_config: StripeConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("GPS_HOST").ok().unwrap_or_else(|| DEFAULT_GPS_HOST.into());
        let port = env::var("GPS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for GPS_PORT. {e} Using the default, {DEFAULT_GPS_PORT}, instead."
                    );
                    DEFAULT_GPS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_GPS_PORT);
        let database_url = env::var("GPS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ GPS_DATABASE_URL is not set. Please set it to the URL for the order database.");
            String::default()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to \
                 the default configuration."
            );
            AuthConfig::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("GPS_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("GPS_USE_FORWARDED").ok(), false);
        let signature_checks = parse_boolean_flag(env::var("GPS_SIGNATURE_CHECKS").ok(), true);
        if !signature_checks {
            warn!(
                "🚨️ Webhook signature checks are DISABLED. Unsigned deliveries will be processed. Never run a \
                 production instance like this."
            );
        }
        let admin_email = env::var("GPS_ADMIN_EMAIL").ok().filter(|s| !s.trim().is_empty());
        if admin_email.is_none() {
            info!("🪛️ GPS_ADMIN_EMAIL is not set. No admin order summaries will be sent.");
        }
        Self {
            host,
            port,
            database_url,
            auth,
            use_x_forwarded_for,
            use_forwarded,
            signature_checks,
            admin_email,
            checkout: CheckoutConfig::from_env_or_default(),
            rate_limit: RateLimitConfig::from_env_or_default(),
            smtp: SmtpConfig::from_env(),
            stripe_config: StripeConfig::new_from_env_or_default(),
        }
    }
}

//-----------------------------------------  CheckoutConfig  -----------------------------------------------------------
/// Settings for checkout-session creation: redirect URLs, the two fixed shipping tiers, and the allow-list of
/// destination countries.
#[derive(Clone, Debug)]
pub struct CheckoutConfig {
    pub success_url: String,
    pub cancel_url: String,
    pub allowed_countries: Vec<String>,
    pub standard_shipping: Cents,
    pub express_shipping: Cents,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            success_url: DEFAULT_SUCCESS_URL.to_string(),
            cancel_url: DEFAULT_CANCEL_URL.to_string(),
            allowed_countries: split_countries(DEFAULT_ALLOWED_COUNTRIES),
            standard_shipping: Cents::from(DEFAULT_STANDARD_SHIPPING),
            express_shipping: Cents::from(DEFAULT_EXPRESS_SHIPPING),
        }
    }
}

impl CheckoutConfig {
    pub fn from_env_or_default() -> Self {
        let success_url = env::var("GPS_SUCCESS_URL").ok().unwrap_or_else(|| {
            info!("🪛️ GPS_SUCCESS_URL is not set. Using the default, {DEFAULT_SUCCESS_URL}.");
            DEFAULT_SUCCESS_URL.to_string()
        });
        let cancel_url = env::var("GPS_CANCEL_URL").ok().unwrap_or_else(|| {
            info!("🪛️ GPS_CANCEL_URL is not set. Using the default, {DEFAULT_CANCEL_URL}.");
            DEFAULT_CANCEL_URL.to_string()
        });
        let allowed_countries = env::var("GPS_ALLOWED_COUNTRIES")
            .map(|s| split_countries(&s))
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| split_countries(DEFAULT_ALLOWED_COUNTRIES));
        let standard_shipping = shipping_tier_from_env("GPS_SHIPPING_STANDARD_CENTS", DEFAULT_STANDARD_SHIPPING);
        let express_shipping = shipping_tier_from_env("GPS_SHIPPING_EXPRESS_CENTS", DEFAULT_EXPRESS_SHIPPING);
        Self { success_url, cancel_url, allowed_countries, standard_shipping, express_shipping }
    }
}

fn split_countries(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_uppercase()).filter(|s| !s.is_empty()).collect()
}

fn shipping_tier_from_env(var: &str, default: i64) -> Cents {
    env::var(var)
        .ok()
        .and_then(|s| {
            s.parse::<i64>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for {var}. {e}. Using the default, {default}."))
                .ok()
        })
        .map(Cents::from)
        .unwrap_or_else(|| Cents::from(default))
}

//-----------------------------------------  RateLimitConfig  ----------------------------------------------------------
#[derive(Clone, Copy, Debug)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { requests_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE, burst: DEFAULT_RATE_LIMIT_BURST }
    }
}

impl RateLimitConfig {
    pub fn from_env_or_default() -> Self {
        let requests_per_minute = env::var("GPS_CHECKOUT_RATE_LIMIT")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_PER_MINUTE);
        let burst =
            env::var("GPS_CHECKOUT_RATE_BURST").ok().and_then(|s| s.parse::<u32>().ok()).unwrap_or(DEFAULT_RATE_LIMIT_BURST);
        Self { requests_per_minute, burst }
    }
}

//-----------------------------------------     SmtpConfig    ----------------------------------------------------------
#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret<String>,
    /// The From mailbox for all notification email, e.g. `Gallery <orders@gallery.example.com>`.
    pub from_address: String,
}

impl SmtpConfig {
    /// SMTP is optional: absence of GPS_SMTP_HOST means the notification fan-out degrades to a no-op.
    pub fn from_env() -> Option<Self> {
        let host = match env::var("GPS_SMTP_HOST") {
            Ok(h) if !h.trim().is_empty() => h,
            _ => {
                info!("🪛️ GPS_SMTP_HOST is not set. Notification email is disabled.");
                return None;
            },
        };
        let port = env::var("GPS_SMTP_PORT").ok().and_then(|s| s.parse::<u16>().ok()).unwrap_or(587);
        let user = env::var("GPS_SMTP_USER").ok().unwrap_or_default();
        let password = Secret::new(env::var("GPS_SMTP_PASSWORD").ok().unwrap_or_default());
        let from_address = env::var("GPS_SMTP_FROM").ok().unwrap_or_else(|| {
            warn!("🪛️ GPS_SMTP_FROM is not set. Using a placeholder sender address.");
            "Gallery <orders@localhost>".to_string()
        });
        Some(Self { host, port, user, password, from_address })
    }
}

//-------------------------------------------  AuthConfig  -------------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 secret used to sign and verify dashboard access tokens.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT signing secret has not been set. I'm using a random value for this session. Tokens \
             will not survive a restart. Set GPS_JWT_SECRET on production instances. 🚨️🚨️🚨️"
        );
        let secret: String = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect();
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, crate::errors::ServerError> {
        let secret = env::var("GPS_JWT_SECRET")
            .map_err(|e| crate::errors::ServerError::ConfigurationError(format!("{e} [GPS_JWT_SECRET]")))?;
        if secret.len() < 16 {
            return Err(crate::errors::ServerError::ConfigurationError(
                "GPS_JWT_SECRET must be at least 16 characters long.".to_string(),
            ));
        }
        Ok(Self { jwt_secret: Secret::new(secret) })
    }
}

//------------------------------------------  ServerOptions  -----------------------------------------------------------
/// A subset of the server configuration that handlers need at request time. Generally we try to keep this as
/// small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub checkout: CheckoutConfig,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
            checkout: config.checkout.clone(),
        }
    }
}
