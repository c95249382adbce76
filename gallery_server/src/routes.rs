//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will
//! cause the current worker to stop processing new requests. For this reason, any long, non-cpu-bound operation
//! (I/O, database queries, provider calls) is expressed as a future so that worker threads keep serving other
//! requests while it is in flight.

use std::net::{IpAddr, Ipv4Addr};

use actix_web::{get, patch, post, web, HttpRequest, HttpResponse, Responder};
use gallery_engine::{OrderFlowApi, OrderFlowError, OrdersApi, SqliteDatabase, order_objects::OrderResult};
use log::*;
use serde_json::json;
use stripe_tools::StripeApi;

use crate::{
    auth::JwtClaims,
    config::ServerOptions,
    data_objects::{CheckoutRequest, OrderQueryParams, OrderUpdateRequest},
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::stripe::build_checkout_session,
    middleware::CheckoutRateLimiter,
};

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------  Checkout  ----------------------------------------------------
/// Create a provider-side checkout session from the client's cart and hand back the hosted-checkout redirect
/// URL. Nothing is written locally; the eventual order materializes when the provider's webhook reports the
/// session as completed.
#[post("/checkout")]
pub async fn checkout(
    req: HttpRequest,
    body: web::Json<CheckoutRequest>,
    api: web::Data<StripeApi>,
    limiter: web::Data<CheckoutRateLimiter>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let ip = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded)
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    if limiter.check_key(&ip).is_err() {
        warn!("💻️ Rate limit exceeded for {ip} on /checkout");
        return Err(ServerError::RateLimited);
    }
    let request = body.into_inner();
    trace!("💻️ POST checkout with {} cart line(s)", request.items.len());
    let session = build_checkout_session(request, &options.checkout)?;
    let created = api.create_checkout_session(&session).await.map_err(|e| {
        error!("💻️ Could not create a checkout session at the provider. {e}");
        ServerError::BackendError(e.to_string())
    })?;
    let url = created
        .url
        .ok_or_else(|| ServerError::BackendError("The provider returned no checkout URL.".to_string()))?;
    debug!("💻️ Checkout session {} created", created.id);
    Ok(HttpResponse::Ok().json(json!({ "url": url })))
}

//----------------------------------------------  Orders  ------------------------------------------------------
/// Admin order listing with filters. See [`OrderQueryParams`] for the accepted query parameters.
#[get("/orders")]
pub async fn orders(
    claims: JwtClaims,
    query: web::Query<OrderQueryParams>,
    api: web::Data<OrdersApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    claims.require_admin()?;
    let filter = query.into_inner().into_filter()?;
    debug!("💻️ GET orders for admin {}: {filter}", claims.sub);
    let orders = api.search_orders(filter).await?;
    Ok(HttpResponse::Ok().json(OrderResult::new(orders)))
}

/// Author order listing: the same shape as the admin listing, forcibly scoped to the artists the authenticated
/// author manages. Requesting an artist outside that set is denied rather than silently narrowed.
#[get("/my/orders")]
pub async fn my_orders(
    claims: JwtClaims,
    query: web::Query<OrderQueryParams>,
    api: web::Data<OrdersApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let mut filter = query.into_inner().into_filter()?;
    if !claims.is_admin() {
        if let Some(&requested) = filter.artists.iter().find(|id| !claims.owns_artist(**id)) {
            return Err(ServerError::InsufficientPermissions(format!(
                "You do not manage artist #{requested}."
            )));
        }
        if filter.artists.is_empty() {
            if claims.artist_ids.is_empty() {
                debug!("💻️ Author {} manages no artists. Returning an empty listing.", claims.sub);
                return Ok(HttpResponse::Ok().json(OrderResult::new(Vec::new())));
            }
            filter = filter.with_artists(claims.artist_ids.clone());
        }
    }
    debug!("💻️ GET my/orders for {}: {filter}", claims.sub);
    let found_orders = api.search_orders(filter).await?;
    Ok(HttpResponse::Ok().json(OrderResult::new(found_orders)))
}

/// Order detail with the items joined against works, artists and variants.
#[get("/orders/{id}")]
pub async fn order_by_id(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrdersApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    require_order_access(&claims, id, &api).await?;
    let summary = api.order_summary(id).await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// Apply a partial update to an order (shipping status, tracking URL; payment status for admins). A transition
/// into `Shipped` triggers the buyer's dispatch notice via the order events.
#[patch("/orders/{id}")]
pub async fn update_order(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<OrderUpdateRequest>,
    flow: web::Data<OrderFlowApi<SqliteDatabase>>,
    api: web::Data<OrdersApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let update = body.into_inner().into_update(claims.role)?;
    require_order_access(&claims, id, &api).await?;
    debug!("💻️ PATCH order #{id} by {}", claims.sub);
    match flow.update_order(id, update).await {
        Ok(order) => Ok(HttpResponse::Ok().json(order)),
        Err(OrderFlowError::OrderNotFound(id)) => Err(ServerError::NoRecordFound(format!("Order #{id}"))),
        Err(OrderFlowError::EmptyUpdate) => {
            Err(ServerError::InvalidRequestBody("The update contains no fields to apply.".to_string()))
        },
        Err(e) => Err(ServerError::BackendError(e.to_string())),
    }
}

/// Admins may touch any order; authors only orders containing at least one of their artists' works.
async fn require_order_access(
    claims: &JwtClaims,
    order_id: i64,
    api: &OrdersApi<SqliteDatabase>,
) -> Result<(), ServerError> {
    if claims.is_admin() {
        return Ok(());
    }
    let artists = api.artist_ids_for_order(order_id).await?;
    if artists.iter().any(|id| claims.owns_artist(*id)) {
        Ok(())
    } else {
        debug!("💻️ {} denied access to order #{order_id}", claims.sub);
        Err(ServerError::InsufficientPermissions("This order contains none of your artists' works.".to_string()))
    }
}
