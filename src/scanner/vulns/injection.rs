//! Injection probes: SQL error surfacing, path traversal, SSRF, and open
//! redirect. Every verdict is a literal signature match; nothing here is
//! exploited beyond the single probing request.

use super::{Probe, ProbeContext};
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::{Severity, VulnerabilityFinding};
use async_trait::async_trait;
use url::Url;

/// Parameters worth probing for SQL error surfacing
const SQLI_PARAMS: &[&str] = &["id", "page", "cat", "item", "product", "user"];

/// Database error banners proving unescaped query interpolation
const SQL_ERROR_SIGNATURES: &[&str] = &[
    "You have an error in your SQL syntax",
    "Warning: mysql_",
    "Warning: mysqli_",
    "PostgreSQL query failed",
    "pg_query(): Query failed",
    "SQLite3::query",
    "Unclosed quotation mark after the character string",
    "ORA-00933",
    "ORA-01756",
];

/// Traversal payload and the file banner that proves it resolved
const TRAVERSAL_PAYLOADS: &[(&str, &str)] = &[
    ("../../../../etc/passwd", "root:x:0:0"),
    ("..%2f..%2f..%2f..%2fetc%2fpasswd", "root:x:0:0"),
    ("../../../../windows/win.ini", "[fonts]"),
];

/// Parameters that commonly take a server-side fetch target
const SSRF_PARAMS: &[&str] = &["url", "uri", "target", "feed", "proxy", "fetch"];

/// Cloud metadata endpoint and the marker an echo would contain
const SSRF_TARGET: &str = "http://169.254.169.254/latest/meta-data/";
const SSRF_SIGNATURES: &[&str] = &["ami-id", "instance-id", "iam/security-credentials"];

/// Redirect-target parameter names
const REDIRECT_PARAMS: &[&str] = &["url", "redirect", "next", "return", "goto", "dest", "continue"];

/// Decoy domain used for open-redirect payloads; never resolvable to a
/// production host
const DECOY_HOST: &str = "example.org";

const REDIRECT_PAYLOADS: &[&str] = &[
    "https://example.org",
    "//example.org",
    "https:///example.org",
];

pub struct InjectionProbe;

#[async_trait]
impl Probe for InjectionProbe {
    fn id(&self) -> &str {
        "injection"
    }

    async fn run(
        &self,
        client: &HttpClient,
        ctx: &ProbeContext,
    ) -> Result<Vec<VulnerabilityFinding>> {
        let mut findings = Vec::new();
        let origin = &ctx.target.origin;

        if let Some(f) = probe_sqli(client, origin, self.id()).await {
            findings.push(f);
        }
        if let Some(f) = probe_traversal(client, origin, self.id()).await {
            findings.push(f);
        }
        if let Some(f) = probe_ssrf(client, origin, self.id()).await {
            findings.push(f);
        }
        if let Some(f) = probe_open_redirect(client, ctx, self.id()).await {
            findings.push(f);
        }

        Ok(findings)
    }
}

async fn probe_sqli(client: &HttpClient, origin: &str, probe_id: &str) -> Option<VulnerabilityFinding> {
    for param in SQLI_PARAMS {
        let url = format!("{origin}/?{param}=1%27");
        let Ok(response) = client.get(&url).await else {
            continue;
        };
        let body = response.text().await.unwrap_or_default();
        if let Some(signature) = SQL_ERROR_SIGNATURES.iter().find(|s| body.contains(*s)) {
            return Some(
                VulnerabilityFinding::new(
                    format!("{probe_id}-sql-error-{param}"),
                    format!("SQL Error Surfaced via Parameter '{param}'"),
                    Severity::Critical,
                    "Injection",
                    format!("A single-quote probe produced a database error banner: {signature}"),
                    &url,
                )
                .with_remediation("Use parameterized queries and suppress database errors in responses.")
                .with_cwe("CWE-89")
                .with_cvss(9.1),
            );
        }
    }
    None
}

async fn probe_traversal(
    client: &HttpClient,
    origin: &str,
    probe_id: &str,
) -> Option<VulnerabilityFinding> {
    for (payload, signature) in TRAVERSAL_PAYLOADS {
        let url = format!("{origin}/?file={payload}");
        let Ok(response) = client.get(&url).await else {
            continue;
        };
        let body = response.text().await.unwrap_or_default();
        if body.contains(signature) {
            return Some(
                VulnerabilityFinding::new(
                    format!("{probe_id}-path-traversal"),
                    "Path Traversal to System Files",
                    Severity::Critical,
                    "Injection",
                    format!("A traversal payload returned system file content ({signature})."),
                    &url,
                )
                .with_remediation("Canonicalize and allow-list file paths before opening them.")
                .with_cwe("CWE-22")
                .with_cvss(9.3),
            );
        }
    }
    None
}

async fn probe_ssrf(client: &HttpClient, origin: &str, probe_id: &str) -> Option<VulnerabilityFinding> {
    for param in SSRF_PARAMS {
        let url = format!("{origin}/?{param}={SSRF_TARGET}");
        let Ok(response) = client.get(&url).await else {
            continue;
        };
        let body = response.text().await.unwrap_or_default();
        if let Some(signature) = SSRF_SIGNATURES.iter().find(|s| body.contains(*s)) {
            return Some(
                VulnerabilityFinding::new(
                    format!("{probe_id}-ssrf-{param}"),
                    format!("Server-Side Request Forgery via Parameter '{param}'"),
                    Severity::Critical,
                    "Injection",
                    format!("The response echoed cloud metadata content ({signature})."),
                    &url,
                )
                .with_remediation(
                    "Block requests to link-local and internal address ranges from \
                     server-side fetchers.",
                )
                .with_cwe("CWE-918")
                .with_cvss(9.1),
            );
        }
    }
    None
}

async fn probe_open_redirect(
    client: &HttpClient,
    ctx: &ProbeContext,
    probe_id: &str,
) -> Option<VulnerabilityFinding> {
    for param in REDIRECT_PARAMS {
        for payload in REDIRECT_PAYLOADS {
            let url = format!("{}/?{param}={payload}", ctx.target.origin);
            let Ok(response) = client.get(&url).await else {
                continue;
            };
            if !response.status().is_redirection() {
                continue;
            }
            let Some(location) = response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok())
            else {
                continue;
            };
            if redirects_off_origin(location, &ctx.target.host) {
                return Some(
                    VulnerabilityFinding::new(
                        format!("{probe_id}-open-redirect-{param}"),
                        format!("Open Redirect via Parameter '{param}'"),
                        Severity::Medium,
                        "Injection",
                        format!("Parameter '{param}' redirected to an external host: {location}"),
                        &url,
                    )
                    .with_remediation(
                        "Allow-list redirect targets or use opaque identifiers instead of URLs.",
                    )
                    .with_cwe("CWE-601")
                    .with_cvss(6.1),
                );
            }
        }
    }
    None
}

/// A Location target is off-origin when its host differs from the audited
/// host, or when it names the decoy domain outright
fn redirects_off_origin(location: &str, origin_host: &str) -> bool {
    if location.contains(DECOY_HOST) {
        return true;
    }
    let absolute = if location.starts_with("//") {
        format!("https:{location}")
    } else {
        location.to_string()
    };
    match Url::parse(&absolute) {
        Ok(url) => url
            .host_str()
            .map(|h| !h.eq_ignore_ascii_case(origin_host))
            .unwrap_or(false),
        // Relative locations stay on the origin
        Err(_) => false,
    }
}
