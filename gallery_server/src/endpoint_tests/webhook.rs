use actix_web::{http::StatusCode, test, web, App};
use gallery_common::Secret;
use gallery_engine::{
    order_objects::OrderQueryFilter,
    test_utils::prepare_env::prepare_test_env,
    OrderFlowApi,
    OrderManagement,
    SqliteDatabase,
    db_types::{OrderStatus, SessionId},
};
use serde_json::json;
use stripe_tools::{signature_header, StripeApi, StripeConfig, SIGNATURE_HEADER};

use super::helpers::{send, spawn_stripe_stub, stub_stripe_config, unreachable_stripe_config};
use crate::{middleware::SignatureMiddlewareFactory, stripe_routes::stripe_webhook};

const WEBHOOK_SECRET: &str = "whsec_endpoint_test";

macro_rules! webhook_app {
    ($db:expr, $stripe:expr, $secret:expr, $enforce:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(StripeApi::new($stripe).expect("client")))
                .app_data(web::Data::new(OrderFlowApi::new($db.clone(), Default::default())))
                .service(
                    web::scope("/stripe")
                        .wrap(SignatureMiddlewareFactory::new($secret, $enforce))
                        .service(stripe_webhook),
                ),
        )
        .await
    };
}

fn secret() -> Option<Secret<String>> {
    Some(Secret::new(WEBHOOK_SECRET.to_string()))
}

fn completed_event(session_id: &str) -> String {
    json!({ "type": "checkout.session.completed", "data": { "object": { "id": session_id } } }).to_string()
}

fn signed_request(body: &str) -> actix_http::Request {
    let header = signature_header(WEBHOOK_SECRET, 1717171717, body.as_bytes());
    test::TestRequest::post()
        .uri("/stripe/webhook")
        .insert_header((SIGNATURE_HEADER, header))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string())
        .to_request()
}

async fn count_orders(db: &SqliteDatabase) -> usize {
    db.search_orders(OrderQueryFilter::default()).await.expect("count query").len()
}

#[actix_web::test]
async fn deliveries_with_a_bad_signature_are_rejected() {
    let db = prepare_test_env().await;
    let app = webhook_app!(db, unreachable_stripe_config(), secret(), true);
    let body = completed_event("cs_forged");
    let req = test::TestRequest::post()
        .uri("/stripe/webhook")
        .insert_header((SIGNATURE_HEADER, "t=1,v1=deadbeef"))
        .set_payload(body)
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("invalid_signature"));
    assert_eq!(count_orders(&db).await, 0, "a rejected delivery must not touch the database");
}

#[actix_web::test]
async fn deliveries_without_a_signature_are_rejected() {
    let db = prepare_test_env().await;
    let app = webhook_app!(db, unreachable_stripe_config(), secret(), true);
    let req = test::TestRequest::post()
        .uri("/stripe/webhook")
        .set_payload(completed_event("cs_unsigned"))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn a_missing_secret_fails_closed_when_enforcing() {
    let db = prepare_test_env().await;
    let app = webhook_app!(db, unreachable_stripe_config(), None, true);
    let req =
        test::TestRequest::post().uri("/stripe/webhook").set_payload(completed_event("cs_nosecret")).to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn a_missing_secret_skips_the_check_in_development_mode() {
    let db = prepare_test_env().await;
    let app = webhook_app!(db, unreachable_stripe_config(), None, false);
    let body = json!({ "type": "payment_intent.created", "data": { "object": { "id": "pi_1" } } }).to_string();
    let req = test::TestRequest::post().uri("/stripe/webhook").set_payload(body).to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ignored"));
}

#[actix_web::test]
async fn other_event_types_are_acknowledged_and_ignored() {
    let db = prepare_test_env().await;
    let app = webhook_app!(db, unreachable_stripe_config(), secret(), true);
    let body = json!({ "type": "charge.refunded", "data": { "object": { "id": "ch_1" } } }).to_string();
    let (status, body) = send(&app, signed_request(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ignored"));
    assert_eq!(count_orders(&db).await, 0);
}

#[actix_web::test]
async fn a_completed_session_is_reconciled_and_redelivery_is_idempotent() {
    let db = prepare_test_env().await;
    let session = json!({
        "id": "cs_e2e_1",
        "url": null,
        "payment_status": "paid",
        "amount_total": 9000,
        "customer_email": null,
        "customer_details": { "email": "buyer@example.com" },
        "metadata": {}
    });
    let line_items = json!({
        "data": [{
            "id": "li_1",
            "quantity": 2,
            "description": "Dune Study II",
            "price": {
                "unit_amount": 4500,
                "currency": "eur",
                "product": { "id": "prod_1", "name": "Dune Study II", "metadata": { "work_id": "1", "variant_id": "1" } }
            }
        }],
        "has_more": false
    });
    let base = spawn_stripe_stub(session, line_items).await;
    let config: StripeConfig = stub_stripe_config(&base);
    let app = webhook_app!(db, config, secret(), true);

    let body = completed_event("cs_e2e_1");
    let (status, response) = send(&app, signed_request(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains(r#""success":true"#));

    let order = db
        .fetch_order_by_session_id(&SessionId::from("cs_e2e_1"))
        .await
        .unwrap()
        .expect("the order must be persisted");
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.email.as_deref(), Some("buyer@example.com"));
    let items = db.fetch_order_items(order.id).await.unwrap();
    assert_eq!(items.len(), 1);

    // Redelivery: acknowledged, nothing new is written.
    let (status, response) = send(&app, signed_request(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("already_paid"));
    assert_eq!(count_orders(&db).await, 1);
    assert_eq!(db.fetch_order_items(order.id).await.unwrap().len(), 1);
}
