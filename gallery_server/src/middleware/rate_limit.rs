//! Keyed rate limiting for the checkout endpoint.
//!
//! The limiter is shared application state, injected via `web::Data`, never a module-level singleton: a
//! multi-instance deployment can swap the constructor for one backed by a shared store without touching the
//! handlers.

use std::{net::IpAddr, num::NonZeroU32, sync::Arc};

use governor::{clock::DefaultClock, state::keyed::DashMapStateStore, Quota, RateLimiter};

use crate::config::RateLimitConfig;

/// Rate limiter keyed by client IP address.
pub type CheckoutRateLimiter = RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock>;

pub fn new_checkout_rate_limiter(config: &RateLimitConfig) -> Arc<CheckoutRateLimiter> {
    let per_minute = config.requests_per_minute.max(1);
    let burst = config.burst.max(1);
    let quota = Quota::per_minute(NonZeroU32::new(per_minute).expect("per_minute is clamped to >= 1"))
        .allow_burst(NonZeroU32::new(burst).expect("burst is clamped to >= 1"));
    Arc::new(RateLimiter::dashmap(quota))
}
