mod rate_limit;
mod signature;

pub use rate_limit::{new_checkout_rate_limiter, CheckoutRateLimiter};
pub use signature::SignatureMiddlewareFactory;
