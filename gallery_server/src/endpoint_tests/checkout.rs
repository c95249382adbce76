use actix_web::{http::StatusCode, test, web, App};
use serde_json::json;
use stripe_tools::StripeApi;

use super::helpers::{send, spawn_stripe_stub, stub_stripe_config, unreachable_stripe_config};
use crate::{
    config::{RateLimitConfig, ServerConfig, ServerOptions},
    middleware::new_checkout_rate_limiter,
    routes::checkout,
};

fn options() -> ServerOptions {
    ServerOptions::from_config(&ServerConfig::default())
}

macro_rules! checkout_app {
    ($config:expr, $rate:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(StripeApi::new($config).expect("client")))
                .app_data(web::Data::new(options()))
                .app_data(web::Data::from(new_checkout_rate_limiter(&$rate)))
                .service(checkout),
        )
        .await
    };
}

#[actix_web::test]
async fn empty_carts_are_rejected_with_a_stable_code() {
    let _ = env_logger::try_init();
    let app = checkout_app!(unreachable_stripe_config(), RateLimitConfig::default());
    let req = test::TestRequest::post().uri("/checkout").set_json(json!({ "items": [] })).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"empty_cart"}"#);
}

#[actix_web::test]
async fn non_positive_prices_are_rejected_before_any_provider_call() {
    let _ = env_logger::try_init();
    // The provider endpoint is unreachable: if validation let the request through, this test would fail with a
    // backend error rather than the stable code.
    let app = checkout_app!(unreachable_stripe_config(), RateLimitConfig::default());
    let cart = json!({
        "items": [{ "workId": 1, "variantId": 1, "title": "Dune Study II", "price": 0.0, "qty": 1 }]
    });
    let req = test::TestRequest::post().uri("/checkout").set_json(cart).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"invalid_price"}"#);
}

#[actix_web::test]
async fn a_valid_cart_returns_the_hosted_checkout_url() {
    let _ = env_logger::try_init();
    let session = json!({
        "id": "cs_stub_1",
        "url": "https://checkout.stripe.com/c/pay/cs_stub_1",
        "payment_status": "unpaid",
        "amount_total": 9000,
        "customer_email": "buyer@example.com",
        "metadata": {}
    });
    let base = spawn_stripe_stub(session, json!({ "data": [], "has_more": false })).await;
    let app = checkout_app!(stub_stripe_config(&base), RateLimitConfig::default());
    let cart = json!({
        "items": [{ "workId": 1, "variantId": 1, "title": "Dune Study II", "price": 45.0, "qty": 2 }],
        "email": "buyer@example.com"
    });
    let req = test::TestRequest::post().uri("/checkout").set_json(cart).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"url":"https://checkout.stripe.com/c/pay/cs_stub_1"}"#);
}

#[actix_web::test]
async fn checkout_is_rate_limited_per_client() {
    let _ = env_logger::try_init();
    let rate = RateLimitConfig { requests_per_minute: 1, burst: 1 };
    let app = checkout_app!(unreachable_stripe_config(), rate);
    let req = test::TestRequest::post().uri("/checkout").set_json(json!({ "items": [] })).to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "first request passes the limiter and fails validation");
    let req = test::TestRequest::post().uri("/checkout").set_json(json!({ "items": [] })).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, r#"{"error":"rate_limited"}"#);
}
