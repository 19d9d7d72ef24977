//! HTTP client wrapper with request tracking and per-operation timeouts

use crate::config::AuditConfig;
use crate::error::Result;
use reqwest::{Client, Response};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Browser-like request headers; some origins vary behavior by signature
const ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// HTTP client wrapper. Redirects are never followed automatically; the
/// fetch tracker records chains itself.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    request_count: Arc<AtomicU64>,
}

impl HttpClient {
    /// Creates a new HttpClient from engine configuration
    pub fn from_config(config: &AuditConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout())
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .cookie_store(true)
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self {
            client,
            request_count: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Sends a GET request with the standard browser-like header set
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let response = self
            .client
            .get(url)
            .header("Accept", ACCEPT)
            .header("Accept-Language", ACCEPT_LANGUAGE)
            .send()
            .await?;
        debug!("GET {} -> {}", url, response.status());
        Ok(response)
    }

    /// Sends a GET request with additional headers
    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<Response> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let mut req = self
            .client
            .get(url)
            .header("Accept", ACCEPT)
            .header("Accept-Language", ACCEPT_LANGUAGE);
        for (key, value) in headers {
            req = req.header(key.as_str(), value.as_str());
        }
        let response = req.send().await?;
        debug!("GET {} -> {}", url, response.status());
        Ok(response)
    }

    /// Sends a form-encoded POST request
    pub async fn post_form(&self, url: &str, body: &str) -> Result<Response> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body.to_string())
            .send()
            .await?;
        debug!("POST {} -> {}", url, response.status());
        Ok(response)
    }

    /// Sends a JSON POST request
    pub async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<Response> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let response = self.client.post(url).json(body).send().await?;
        debug!("POST {} -> {}", url, response.status());
        Ok(response)
    }

    /// Sends a GET with a shorter timeout than the client default, for
    /// probes that must stay cheap
    pub async fn get_with_timeout(&self, url: &str, timeout: Duration) -> Result<Response> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let response = self
            .client
            .get(url)
            .header("Accept", ACCEPT)
            .timeout(timeout)
            .send()
            .await?;
        debug!("GET {} -> {}", url, response.status());
        Ok(response)
    }

    /// Returns the total number of requests made through this client
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }
}
