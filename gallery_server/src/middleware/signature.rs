//! Webhook signature middleware for Actix Web.
//!
//! The payment provider signs every webhook delivery over the raw request body; the signature arrives in the
//! `Stripe-Signature` header. This middleware verifies the signature before the body reaches any handler, and
//! re-attaches the consumed payload so handlers can still read it.
//!
//! When no signing secret is configured the behaviour is governed by the `enforce` flag: enforcing instances
//! (the default) fail closed, while development instances log a warning and let the delivery through unsigned.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorBadRequest, ErrorForbidden},
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use gallery_common::Secret;
use log::{trace, warn};
use stripe_tools::{verify_signature_header, SIGNATURE_HEADER};

pub struct SignatureMiddlewareFactory {
    secret: Option<Secret<String>>,
    enforce: bool,
}

impl SignatureMiddlewareFactory {
    pub fn new(secret: Option<Secret<String>>, enforce: bool) -> Self {
        SignatureMiddlewareFactory { secret, enforce }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SignatureMiddlewareService {
            secret: self.secret.clone(),
            enforce: self.enforce,
            service: Rc::new(service),
        }))
    }
}

pub struct SignatureMiddlewareService<S> {
    secret: Option<Secret<String>>,
    enforce: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.secret.clone();
        let enforce = self.enforce;
        Box::pin(async move {
            trace!("🔐️ Checking webhook signature for request");
            let secret = match secret {
                Some(secret) => secret,
                None if enforce => {
                    warn!("🔐️ No webhook signing secret is configured. Denying access.");
                    return Err(ErrorForbidden("invalid_signature"));
                },
                None => {
                    warn!("🔐️ No webhook signing secret is configured. Signature check skipped.");
                    return service.call(req).await;
                },
            };
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {:?}", e);
                ErrorBadRequest("Failed to extract request data.")
            })?;
            let header = req
                .headers()
                .get(SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    warn!("🔐️ No signature found in request. Denying access.");
                    ErrorForbidden("invalid_signature")
                })?;
            match verify_signature_header(secret.reveal(), header, data.as_ref()) {
                Ok(()) => {
                    trace!("🔐️ Signature check for request ✅️");
                    req.set_payload(bytes_to_payload(data));
                    service.call(req).await
                },
                Err(e) => {
                    warn!("🔐️ Invalid signature on request: {e}. Denying access.");
                    Err(ErrorForbidden("invalid_signature"))
                },
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
