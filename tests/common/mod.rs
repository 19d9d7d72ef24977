//! Common test utilities

use std::collections::HashMap;
use std::sync::Arc;
use vigil::cache::CircuitBreaker;
use vigil::config::AuditConfig;
use vigil::http::{fetch_page, FetchedPage, HttpClient};
use vigil::scanner::vulns::ProbeContext;
use vigil::target::Target;

/// Test configuration with short timeouts
pub fn test_config() -> AuditConfig {
    AuditConfig {
        http_timeout_secs: 5,
        connect_timeout_secs: 1,
        ..AuditConfig::default()
    }
}

pub fn test_client(config: &AuditConfig) -> HttpClient {
    HttpClient::from_config(config).expect("client")
}

/// Builds a probe context by fetching the target's index page
#[allow(dead_code)]
pub async fn probe_context(uri: &str) -> (HttpClient, Arc<ProbeContext>) {
    probe_context_with(test_config(), uri).await
}

/// Probe context under a caller-supplied configuration
#[allow(dead_code)]
pub async fn probe_context_with(
    config: AuditConfig,
    uri: &str,
) -> (HttpClient, Arc<ProbeContext>) {
    let client = test_client(&config);
    let target = Target::parse(uri).expect("target");
    let page = fetch_page(&client, &target, &config).await.expect("fetch");

    let ctx = Arc::new(ProbeContext {
        target,
        page,
        dns: Vec::new(),
        config,
        breaker: Arc::new(CircuitBreaker::default()),
    });
    (client, ctx)
}

/// Builds a probe context around a synthetic page, no fetch involved
#[allow(dead_code)]
pub fn synthetic_context(uri: &str, body: &str, headers: &[(&str, &str)]) -> Arc<ProbeContext> {
    let target = Target::parse(uri).expect("target");
    let page = FetchedPage {
        final_url: format!("{}/", target.origin),
        status: 200,
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>(),
        body: body.to_string(),
        cookies: Vec::new(),
        redirect_chain: Vec::new(),
    };
    Arc::new(ProbeContext {
        target,
        page,
        dns: Vec::new(),
        config: test_config(),
        breaker: Arc::new(CircuitBreaker::default()),
    })
}
