use actix_web::{
    body::{to_bytes, MessageBody},
    dev::{Service, ServiceResponse},
    http::StatusCode,
    web,
    App,
    HttpResponse,
    HttpServer,
};
use gallery_common::Secret;
use serde_json::Value;
use stripe_tools::StripeConfig;

use crate::{
    auth::{JwtClaims, Role, TokenIssuer},
    config::AuthConfig,
};

pub const TEST_JWT_SECRET: &str = "endpoint-test-secret-0123456789";

pub fn test_auth_config() -> AuthConfig {
    AuthConfig { jwt_secret: Secret::new(TEST_JWT_SECRET.to_string()) }
}

pub fn issue_token(role: Role, artist_ids: Vec<i64>) -> String {
    let issuer = TokenIssuer::new(&test_auth_config());
    issuer.issue_token(&JwtClaims::new("test-account", role, artist_ids)).expect("Could not issue test token")
}

/// Call the service and flatten middleware-level errors into a plain (status, body) pair, so tests can assert on
/// rejected requests the same way as on successful ones.
pub async fn send<S, B>(app: &S, req: actix_http::Request) -> (StatusCode, String)
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    match app.call(req).await {
        Ok(resp) => {
            let status = resp.status();
            let body = actix_web::test::read_body(resp).await;
            (status, String::from_utf8_lossy(&body).to_string())
        },
        Err(e) => {
            let resp = e.error_response();
            let status = resp.status();
            let body = to_bytes(resp.into_body()).await.unwrap_or_default();
            (status, String::from_utf8_lossy(&body).to_string())
        },
    }
}

//--------------------------------------   Stub payment provider   ----------------------------------------------------

struct StubSession(Value);
struct StubLineItems(Value);

async fn create_session(session: web::Data<StubSession>) -> HttpResponse {
    HttpResponse::Ok().json(&session.0)
}

async fn get_session(session: web::Data<StubSession>) -> HttpResponse {
    HttpResponse::Ok().json(&session.0)
}

async fn get_line_items(items: web::Data<StubLineItems>) -> HttpResponse {
    HttpResponse::Ok().json(&items.0)
}

/// Spawn a local stand-in for the provider's REST API that answers session creation and retrieval with the given
/// canned payloads. Returns the base URL to point a [`StripeConfig`] at.
pub async fn spawn_stripe_stub(session: Value, line_items: Value) -> String {
    let session = web::Data::new(StubSession(session));
    let line_items = web::Data::new(StubLineItems(line_items));
    let server = HttpServer::new(move || {
        App::new()
            .app_data(session.clone())
            .app_data(line_items.clone())
            .route("/checkout/sessions", web::post().to(create_session))
            .route("/checkout/sessions/{id}", web::get().to(get_session))
            .route("/checkout/sessions/{id}/line_items", web::get().to(get_line_items))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .expect("Could not bind the stub provider");
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{addr}")
}

pub fn stub_stripe_config(api_base: &str) -> StripeConfig {
    StripeConfig {
        api_base: api_base.to_string(),
        api_version: "2024-06-20".to_string(),
        secret_key: Secret::new("sk_test_stub".to_string()),
        webhook_secret: None,
    }
}

/// A provider config pointing nowhere, for tests that must fail before any provider call is made.
pub fn unreachable_stripe_config() -> StripeConfig {
    stub_stripe_config("http://127.0.0.1:1")
}
