use std::{fmt::Debug, future::Future, time::Duration};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, RETRY_AFTER},
    Client,
    Url,
};
use thiserror::Error;

use super::response::{interpret_response, AccrualOutcome};
use crate::db_types::OrderNumber;

#[derive(Debug, Clone, Error)]
pub enum AccrualClientError {
    #[error("Invalid accrual service address '{0}': {1}")]
    InvalidBaseUrl(String, String),
    #[error("Could not build the HTTP client: {0}")]
    ClientBuildError(String),
}

/// Fetches the accrual status of a single order.
///
/// Implementations never fail: every failure mode is expressed as an [`AccrualOutcome`]. The returned future must be
/// `Send`, since the reconciliation agent polls from worker tasks.
pub trait AccrualClient {
    fn fetch(&self, number: &OrderNumber) -> impl Future<Output = AccrualOutcome> + Send;
}

/// An [`AccrualClient`] that talks to the accrual service over HTTP.
#[derive(Clone)]
pub struct HttpAccrualClient {
    client: Client,
    base: Url,
}

impl Debug for HttpAccrualClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HttpAccrualClient ({})", self.base)
    }
}

impl HttpAccrualClient {
    /// Creates a new client for the accrual service at `base`. A bare `host:port` is taken to mean `http://host:port`.
    /// Every request is abandoned after `timeout`.
    pub fn new(base: &str, timeout: Duration) -> Result<Self, AccrualClientError> {
        let base = Self::parse_base(base)?;
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .user_agent("Loyalty Accrual Reconciler")
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| AccrualClientError::ClientBuildError(e.to_string()))?;
        info!("🛰️ Accrual client configured for {base}");
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// The URL used to query the given order.
    pub fn order_url(&self, number: &OrderNumber) -> Url {
        let mut url = self.base.clone();
        let path = format!("{}/api/orders/{}", self.base.path().trim_end_matches('/'), number.as_str());
        url.set_path(&path);
        url
    }

    fn parse_base(base: &str) -> Result<Url, AccrualClientError> {
        let trimmed = base.trim();
        let with_scheme = if trimmed.contains("://") { trimmed.to_string() } else { format!("http://{trimmed}") };
        let url = Url::parse(&with_scheme).map_err(|e| AccrualClientError::InvalidBaseUrl(base.to_string(), e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(AccrualClientError::InvalidBaseUrl(base.to_string(), "expected an http(s) address".into()));
        }
        Ok(url)
    }

    async fn fetch_order(&self, number: &OrderNumber) -> AccrualOutcome {
        let url = self.order_url(number);
        trace!("🛰️ GET {url}");
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                let reason = if e.is_timeout() { format!("request timed out: {e}") } else { e.to_string() };
                return AccrualOutcome::Transient(reason);
            },
        };
        let status = response.status();
        let retry_after = response.headers().get(RETRY_AFTER).and_then(|v| v.to_str().ok()).map(String::from);
        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return AccrualOutcome::Transient(format!("could not read response body: {e}")),
        };
        let outcome = interpret_response(number, status, retry_after.as_deref(), &body);
        trace!("🛰️ Order {number}: {outcome}");
        outcome
    }
}

impl AccrualClient for HttpAccrualClient {
    fn fetch(&self, number: &OrderNumber) -> impl Future<Output = AccrualOutcome> + Send {
        self.fetch_order(number)
    }
}
