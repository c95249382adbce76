use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::de::DeserializeOwned;

use crate::{
    config::StripeConfig,
    data_objects::{CheckoutSession, LineItem, LineItemList, NewCheckoutSession},
    StripeApiError,
};

const LINE_ITEM_PAGE_SIZE: usize = 100;

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let val = HeaderValue::from_str(&bearer).map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        let version =
            HeaderValue::from_str(&config.api_version).map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        headers.insert("Stripe-Version", version);
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base)
    }

    async fn rest_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        form: Option<&[(String, String)]>,
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {url}");
        let mut req = self.client.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(form) = form {
            req = req.form(form);
        }
        let response = req.send().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
            Err(StripeApiError::QueryError { status, message })
        }
    }

    /// Create a hosted Checkout Session. The returned session carries the redirect URL for the buyer.
    /// Nothing is persisted locally at this point; the session only exists provider-side until its
    /// `checkout.session.completed` webhook arrives.
    pub async fn create_checkout_session(
        &self,
        session: &NewCheckoutSession,
    ) -> Result<CheckoutSession, StripeApiError> {
        debug!("Creating checkout session with {} line item(s)", session.line_items.len());
        let form = session.to_form();
        let result: CheckoutSession =
            self.rest_query(Method::POST, "/checkout/sessions", &[], Some(form.as_slice())).await?;
        info!("Created checkout session {}", result.id);
        Ok(result)
    }

    /// Fetch the full session. Amounts and metadata on this object are the authoritative source of truth during
    /// reconciliation; client-supplied prices are never trusted for persistence.
    pub async fn fetch_checkout_session(&self, session_id: &str) -> Result<CheckoutSession, StripeApiError> {
        let path = format!("/checkout/sessions/{session_id}");
        debug!("Fetching checkout session {session_id}");
        self.rest_query(Method::GET, &path, &[], None).await
    }

    /// Fetch all line items for a session, with `data.price.product` expanded so that the product metadata
    /// (`work_id`/`variant_id`) is available for reconciliation. Follows pagination until exhausted.
    pub async fn fetch_session_line_items(&self, session_id: &str) -> Result<Vec<LineItem>, StripeApiError> {
        let path = format!("/checkout/sessions/{session_id}/line_items");
        let mut items = Vec::new();
        let mut starting_after: Option<String> = None;
        loop {
            let mut params = vec![
                ("limit".to_string(), LINE_ITEM_PAGE_SIZE.to_string()),
                ("expand[]".to_string(), "data.price.product".to_string()),
            ];
            if let Some(cursor) = &starting_after {
                params.push(("starting_after".to_string(), cursor.clone()));
            }
            let page: LineItemList = self.rest_query(Method::GET, &path, &params, None).await?;
            let n = page.data.len();
            trace!("Fetched {n} line item(s) for session {session_id}");
            starting_after = page.data.last().map(|item| item.id.clone());
            items.extend(page.data);
            if !page.has_more || n == 0 {
                break;
            }
        }
        debug!("Session {session_id} has {} line item(s)", items.len());
        Ok(items)
    }
}
