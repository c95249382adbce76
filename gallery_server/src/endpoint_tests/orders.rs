use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use actix_web::{http::StatusCode, test, web, App};
use gallery_common::Cents;
use gallery_engine::{
    db_types::{NewOrder, NewOrderItem, SessionId},
    events::{EventHandlers, EventHooks, EventProducers},
    test_utils::prepare_env::prepare_test_env,
    OrderFlowApi,
    OrdersApi,
    SqliteDatabase,
};
use serde_json::{json, Value};

use super::helpers::{issue_token, send, test_auth_config};
use crate::{
    auth::{Role, TokenIssuer},
    routes::{my_orders, order_by_id, orders as orders_route, update_order},
};

macro_rules! orders_app {
    ($db:expr, $producers:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(OrdersApi::new($db.clone())))
                .app_data(web::Data::new(OrderFlowApi::new($db.clone(), $producers)))
                .app_data(web::Data::new(TokenIssuer::new(&test_auth_config())))
                .service(
                    web::scope("/api")
                        .service(orders_route)
                        .service(my_orders)
                        .service(order_by_id)
                        .service(update_order),
                ),
        )
        .await
    };
}

/// Order #1 contains a work by artist 1 (Mara), order #2 a work by artist 2 (Ilya).
async fn seed_two_orders(db: &SqliteDatabase) -> (i64, i64) {
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let mara = NewOrder::new(
        SessionId::from("cs_orders_1"),
        Cents::from(4500),
        vec![NewOrderItem { work_id: 1, variant_id: None, quantity: 1, unit_price: Cents::from(4500) }],
    )
    .with_email("buyer-one@example.com");
    let ilya = NewOrder::new(
        SessionId::from("cs_orders_2"),
        Cents::from(8000),
        vec![NewOrderItem { work_id: 3, variant_id: None, quantity: 1, unit_price: Cents::from(8000) }],
    );
    let first = api.process_paid_session(mara, vec![]).await.expect("order 1").order().id;
    let second = api.process_paid_session(ilya, vec![]).await.expect("order 2").order().id;
    (first, second)
}

fn get(path: &str, token: Option<&str>) -> actix_http::Request {
    let mut req = test::TestRequest::get().uri(path);
    if let Some(token) = token {
        req = req.insert_header(("Authorization", format!("Bearer {token}")));
    }
    req.to_request()
}

fn patch(path: &str, token: &str, body: Value) -> actix_http::Request {
    test::TestRequest::patch()
        .uri(path)
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(body)
        .to_request()
}

#[actix_web::test]
async fn listing_requires_a_token() {
    let db = prepare_test_env().await;
    let app = orders_app!(db, EventProducers::default());
    let (status, _) = send(&app, get("/api/orders", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn the_admin_listing_is_admin_only() {
    let db = prepare_test_env().await;
    let app = orders_app!(db, EventProducers::default());
    let token = issue_token(Role::Author, vec![1]);
    let (status, _) = send(&app, get("/api/orders", Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admins_see_all_orders_with_shipping_statuses() {
    let db = prepare_test_env().await;
    seed_two_orders(&db).await;
    let app = orders_app!(db, EventProducers::default());
    let token = issue_token(Role::Admin, vec![]);
    let (status, body) = send(&app, get("/api/orders", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["orders"].as_array().unwrap().len(), 2);
    assert_eq!(result["shippingStatuses"].as_array().unwrap().len(), 4);
}

#[actix_web::test]
async fn authors_only_see_their_own_artists_orders() {
    let db = prepare_test_env().await;
    let (mara_order, _) = seed_two_orders(&db).await;
    let app = orders_app!(db, EventProducers::default());
    let token = issue_token(Role::Author, vec![1]);
    let (status, body) = send(&app, get("/api/my/orders", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).unwrap();
    let orders = result["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"].as_i64().unwrap(), mara_order);
}

#[actix_web::test]
async fn authors_cannot_request_a_foreign_artist_filter() {
    let db = prepare_test_env().await;
    seed_two_orders(&db).await;
    let app = orders_app!(db, EventProducers::default());
    let token = issue_token(Role::Author, vec![1]);
    let (status, _) = send(&app, get("/api/my/orders?artistId=2", Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn order_detail_is_scoped_to_the_owning_author() {
    let db = prepare_test_env().await;
    let (mara_order, ilya_order) = seed_two_orders(&db).await;
    let app = orders_app!(db, EventProducers::default());
    let token = issue_token(Role::Author, vec![1]);
    let (status, body) = send(&app, get(&format!("/api/orders/{mara_order}"), Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let summary: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(summary["items"][0]["artistName"], "Mara Voss");
    let (status, _) = send(&app, get(&format!("/api/orders/{ilya_order}"), Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn an_admin_patch_into_shipped_notifies_exactly_once() {
    let db = prepare_test_env().await;
    let (mara_order, _) = seed_two_orders(&db).await;

    let shipped_events = Arc::new(AtomicU64::new(0));
    let counter = shipped_events.clone();
    let mut hooks = EventHooks::default();
    hooks.on_order_shipped(move |_ev| {
        let counter = counter.clone();
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(8, hooks);
    let producers = handlers.producers();
    let drained = tokio::spawn(handlers.run());

    let app = orders_app!(db, producers);
    let token = issue_token(Role::Admin, vec![]);
    let body = json!({ "shippingStatus": "shipped", "trackingUrl": "https://tracking.example.com/p/9" });
    let (status, response) = send(&app, patch(&format!("/api/orders/{mara_order}"), &token, body)).await;
    assert_eq!(status, StatusCode::OK);
    let updated: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(updated["shippingStatus"], "shipped");
    assert_eq!(updated["trackingUrl"], "https://tracking.example.com/p/9");

    // Re-saving the same status must not republish.
    let body = json!({ "shippingStatus": "shipped" });
    let (status, _) = send(&app, patch(&format!("/api/orders/{mara_order}"), &token, body)).await;
    assert_eq!(status, StatusCode::OK);

    drop(app);
    drained.await.unwrap();
    assert_eq!(shipped_events.load(Ordering::SeqCst), 1);
}

#[actix_web::test]
async fn authors_cannot_touch_foreign_orders_or_payment_status() {
    let db = prepare_test_env().await;
    let (mara_order, ilya_order) = seed_two_orders(&db).await;
    let app = orders_app!(db, EventProducers::default());
    let token = issue_token(Role::Author, vec![1]);

    let body = json!({ "shippingStatus": "packing" });
    let (status, _) = send(&app, patch(&format!("/api/orders/{ilya_order}"), &token, body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "cross-artist update must be denied");

    let body = json!({ "status": "refunded" });
    let (status, _) = send(&app, patch(&format!("/api/orders/{mara_order}"), &token, body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "payment status is admin-only");

    let body = json!({ "shippingStatus": "packing" });
    let (status, _) = send(&app, patch(&format!("/api/orders/{mara_order}"), &token, body)).await;
    assert_eq!(status, StatusCode::OK, "authors may update fulfilment on their own orders");
}

#[actix_web::test]
async fn patching_an_unknown_order_is_not_found() {
    let db = prepare_test_env().await;
    let app = orders_app!(db, EventProducers::default());
    let token = issue_token(Role::Admin, vec![]);
    let body = json!({ "shippingStatus": "packing" });
    let (status, _) = send(&app, patch("/api/orders/9999", &token, body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn an_empty_patch_is_rejected() {
    let db = prepare_test_env().await;
    let (mara_order, _) = seed_two_orders(&db).await;
    let app = orders_app!(db, EventProducers::default());
    let token = issue_token(Role::Admin, vec![]);
    let (status, _) = send(&app, patch(&format!("/api/orders/{mara_order}"), &token, json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
