//! LLM-backed prose enrichment for leak findings.
//!
//! Disabled unless an endpoint is configured. Enrichment is best-effort:
//! any upstream fault logs a warning and returns the findings unchanged.

use crate::cache::CircuitBreaker;
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::SourceLeakFinding;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

const ENRICH_UPSTREAM: &str = "llm-enrichment";

/// Trait for leak-description enrichment backends
#[async_trait]
pub trait LeakEnricher: Send + Sync {
    /// Rewrites leak descriptions with richer remediation prose. Returns the
    /// input unchanged when enrichment is unavailable.
    async fn enrich(&self, leaks: Vec<SourceLeakFinding>) -> Vec<SourceLeakFinding>;
}

/// Completion-endpoint enricher
pub struct HttpLeakEnricher {
    client: HttpClient,
    breaker: Arc<CircuitBreaker>,
    endpoint: Option<String>,
    model: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    response: String,
}

impl HttpLeakEnricher {
    pub fn new(
        client: HttpClient,
        breaker: Arc<CircuitBreaker>,
        endpoint: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            breaker,
            endpoint,
            model: model.into(),
        }
    }

    async fn enrich_one(
        &self,
        endpoint: &str,
        leak: &SourceLeakFinding,
    ) -> Result<Option<String>> {
        let prompt = format!(
            "In two sentences, explain the operational risk of this exposure and \
             the first remediation step. Exposure: {} at {}.",
            leak.title, leak.url
        );
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self.client.post_json(endpoint, &body).await?;
        if !response.status().is_success() {
            return Ok(None);
        }
        let completion: CompletionResponse = response.json().await?;
        let text = completion.response.trim().to_string();
        Ok((!text.is_empty()).then_some(text))
    }
}

#[async_trait]
impl LeakEnricher for HttpLeakEnricher {
    async fn enrich(&self, mut leaks: Vec<SourceLeakFinding>) -> Vec<SourceLeakFinding> {
        let Some(endpoint) = self.endpoint.clone() else {
            debug!("leak enrichment not configured");
            return leaks;
        };
        if leaks.is_empty() {
            return leaks;
        }
        if !self.breaker.is_allowed(ENRICH_UPSTREAM).await {
            warn!("enrichment circuit open, returning findings unchanged");
            return leaks;
        }

        let mut enriched = 0;
        for leak in leaks.iter_mut() {
            match self.enrich_one(&endpoint, leak).await {
                Ok(Some(text)) => {
                    self.breaker.record_success(ENRICH_UPSTREAM).await;
                    leak.description = format!("{} {text}", leak.description);
                    enriched += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("enrichment failed for '{}': {e}", leak.id);
                    self.breaker.record_failure(ENRICH_UPSTREAM).await;
                    if !self.breaker.is_allowed(ENRICH_UPSTREAM).await {
                        break;
                    }
                }
            }
        }
        info!("enriched {enriched}/{} leak findings", leaks.len());
        leaks
    }
}
