//! Reflected-content probe: benign marker injection into common query
//! parameters, flagging unescaped echoes.

use super::{Probe, ProbeContext};
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::{Severity, VulnerabilityFinding};
use async_trait::async_trait;
use tracing::debug;

/// Query parameters most commonly echoed back into markup
const COMMON_PARAMS: &[&str] = &[
    "q", "s", "search", "query", "keyword", "name", "page", "ref", "callback",
];

/// Marker wrapped in angle brackets: an unescaped echo proves markup is not
/// being encoded, without executing anything
const MARKER: &str = "vigilrx9k2";

pub struct ReflectedProbe;

#[async_trait]
impl Probe for ReflectedProbe {
    fn id(&self) -> &str {
        "reflected-input"
    }

    async fn run(
        &self,
        client: &HttpClient,
        ctx: &ProbeContext,
    ) -> Result<Vec<VulnerabilityFinding>> {
        let mut findings = Vec::new();
        let payload = format!("<{MARKER}>");
        let encoded = format!("%3C{MARKER}%3E");

        for param in COMMON_PARAMS {
            let url = format!("{}/?{param}={encoded}", ctx.target.origin);
            let body = match client.get(&url).await {
                Ok(resp) => resp.text().await.unwrap_or_default(),
                Err(e) => {
                    debug!("reflected probe request failed for '{param}': {e}");
                    continue;
                }
            };

            if body.contains(&payload) {
                findings.push(
                    VulnerabilityFinding::new(
                        format!("{}-{param}", self.id()),
                        format!("Unescaped Reflection of Parameter '{param}'"),
                        Severity::High,
                        "Injection",
                        format!(
                            "Query parameter '{param}' is echoed into the response body \
                             without HTML encoding."
                        ),
                        &url,
                    )
                    .with_remediation(
                        "HTML-encode all user-controlled output and deploy a strict \
                         Content-Security-Policy.",
                    )
                    .with_cwe("CWE-79")
                    .with_cvss(7.1),
                );
            }
        }

        Ok(findings)
    }
}
