//! Subdomain enumeration via certificate-transparency logs.
//!
//! Queries crt.sh behind the circuit breaker, deduplicates the names, and
//! live-probes a bounded subset of suspicious-prefix subdomains to flag
//! reachable pre-production hosts.

use super::{Probe, ProbeContext};
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::{Severity, VulnerabilityFinding};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, warn};

const CT_LOG_UPSTREAM: &str = "crt.sh";

/// Prefixes that mark hosts not meant for production traffic
const SUSPICIOUS_PREFIXES: &[&str] = &[
    "dev", "staging", "stage", "test", "qa", "uat", "admin", "internal", "beta", "preprod",
];

/// Cap on live probes against suspicious names
const MAX_LIVE_PROBES: usize = 10;

#[derive(Deserialize)]
struct CtLogEntry {
    name_value: String,
}

pub struct SubdomainProbe;

#[async_trait]
impl Probe for SubdomainProbe {
    fn id(&self) -> &str {
        "subdomain-exposure"
    }

    async fn run(
        &self,
        client: &HttpClient,
        ctx: &ProbeContext,
    ) -> Result<Vec<VulnerabilityFinding>> {
        if !ctx.breaker.is_allowed(CT_LOG_UPSTREAM).await {
            warn!("ct-log circuit open, skipping subdomain enumeration");
            return Ok(Vec::new());
        }

        let names = match query_ct_log(client, &ctx.target.host).await {
            Ok(names) => {
                ctx.breaker.record_success(CT_LOG_UPSTREAM).await;
                names
            }
            Err(e) => {
                ctx.breaker.record_failure(CT_LOG_UPSTREAM).await;
                warn!("ct-log query failed: {e}");
                return Ok(Vec::new());
            }
        };
        info!("ct log returned {} distinct names", names.len());

        let suspicious: Vec<&String> = names
            .iter()
            .filter(|name| {
                name.split('.')
                    .next()
                    .map(|label| SUSPICIOUS_PREFIXES.contains(&label))
                    .unwrap_or(false)
            })
            .take(MAX_LIVE_PROBES)
            .collect();

        let mut findings = Vec::new();
        for name in suspicious {
            if !is_live(client, name).await {
                debug!("suspicious subdomain {name} is not reachable");
                continue;
            }
            findings.push(
                VulnerabilityFinding::new(
                    format!("{}-{}", self.id(), name.replace('.', "-")),
                    format!("Live Pre-Production Host '{name}'"),
                    Severity::Medium,
                    "Attack Surface",
                    format!(
                        "Certificate-transparency logs list {name} and the host answers \
                         HTTPS requests."
                    ),
                    name,
                )
                .with_remediation(
                    "Restrict non-production hosts to internal networks or require \
                     authentication at the edge.",
                )
                .with_cwe("CWE-668"),
            );
        }

        Ok(findings)
    }
}

/// Fetches and deduplicates certificate names for the apex domain
async fn query_ct_log(client: &HttpClient, host: &str) -> Result<BTreeSet<String>> {
    let url = format!("https://crt.sh/?q=%25.{host}&output=json");
    let response = client.get_with_timeout(&url, Duration::from_secs(15)).await?;
    let entries: Vec<CtLogEntry> = response.json().await?;
    Ok(collect_subdomains(&entries, host))
}

/// Keeps only true children of the apex. A bare suffix match would also
/// admit registrable lookalikes such as `evilexample.com` for `example.com`,
/// so the name must end with `.{host}`.
fn collect_subdomains(entries: &[CtLogEntry], host: &str) -> BTreeSet<String> {
    let suffix = format!(".{host}");
    let mut names = BTreeSet::new();
    for entry in entries {
        for name in entry.name_value.lines() {
            let name = name.trim().trim_start_matches("*.").to_lowercase();
            if name.ends_with(&suffix) {
                names.insert(name);
            }
        }
    }
    names
}

async fn is_live(client: &HttpClient, name: &str) -> bool {
    client
        .get_with_timeout(&format!("https://{name}/"), Duration::from_secs(5))
        .await
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(raw: &str) -> CtLogEntry {
        CtLogEntry {
            name_value: raw.to_string(),
        }
    }

    #[test]
    fn lookalike_registrable_domains_are_excluded() {
        let entries = vec![
            entry("dev.example.com\n*.api.example.com"),
            entry("evilexample.com"),
            entry("example.com"),
        ];
        let names = collect_subdomains(&entries, "example.com");
        assert!(names.contains("dev.example.com"));
        assert!(names.contains("api.example.com"));
        assert!(!names.contains("evilexample.com"));
        assert!(!names.contains("example.com"));
    }

    #[test]
    fn suspicious_prefix_matches_first_label_only() {
        let names: BTreeSet<String> = ["dev.example.com", "www.example.com", "cdn-dev.example.com"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let suspicious: Vec<_> = names
            .iter()
            .filter(|name| {
                name.split('.')
                    .next()
                    .map(|label| SUSPICIOUS_PREFIXES.contains(&label))
                    .unwrap_or(false)
            })
            .collect();
        assert_eq!(suspicious, vec!["dev.example.com"]);
    }
}
