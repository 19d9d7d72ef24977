//! Admin and sensitive-path discovery behind a soft-404 baseline.
//!
//! A candidate is reported only when its response differs materially from
//! the baseline, matches the content shape expected for that exact path,
//! and is not itself an HTML document.

use super::{Probe, ProbeContext};
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::{Severity, VulnerabilityFinding};
use crate::scanner::soft404::{is_html_document, Soft404Baseline};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use regex::Regex;
use tracing::debug;

struct PathRule {
    path: &'static str,
    label: &'static str,
    severity: Severity,
    /// Content shape the real file must exhibit
    shape: &'static str,
    /// Whether an HTML body is acceptable for this path
    html_ok: bool,
}

const PATH_RULES: &[PathRule] = &[
    PathRule {
        path: "phpinfo.php",
        label: "PHP info page",
        severity: Severity::High,
        shape: r"PHP Version|phpinfo\(\)",
        html_ok: true,
    },
    PathRule {
        path: "server-status",
        label: "Apache server status",
        severity: Severity::High,
        shape: r"Apache Server Status|requests currently being processed",
        html_ok: true,
    },
    PathRule {
        path: "server-info",
        label: "Apache server info",
        severity: Severity::High,
        shape: r"Apache Server Information|Server Settings",
        html_ok: true,
    },
    PathRule {
        path: ".htpasswd",
        label: "Apache password file",
        severity: Severity::Critical,
        shape: r"(?m)^[^\s:<]+:\$?[^\s:]+",
        html_ok: false,
    },
    PathRule {
        path: ".htaccess",
        label: "Apache directory configuration",
        severity: Severity::Medium,
        shape: r"RewriteRule|Deny from|Allow from|AuthType",
        html_ok: false,
    },
    PathRule {
        path: "web.config",
        label: "IIS configuration",
        severity: Severity::High,
        shape: r"<configuration|<system\.web",
        html_ok: false,
    },
    PathRule {
        path: "actuator/env",
        label: "Spring Boot environment endpoint",
        severity: Severity::Critical,
        shape: r#"propertySources|"activeProfiles""#,
        html_ok: false,
    },
    PathRule {
        path: "actuator",
        label: "Spring Boot actuator index",
        severity: Severity::High,
        shape: r#""_links""#,
        html_ok: false,
    },
    PathRule {
        path: "wp-json/wp/v2/users",
        label: "WordPress user enumeration endpoint",
        severity: Severity::Medium,
        shape: r#"^\s*\[.*"slug""#,
        html_ok: false,
    },
    PathRule {
        path: "xmlrpc.php",
        label: "XML-RPC endpoint",
        severity: Severity::Medium,
        shape: r"XML-RPC server accepts POST requests only",
        html_ok: false,
    },
    PathRule {
        path: "elmah.axd",
        label: "ELMAH error log",
        severity: Severity::High,
        shape: r"Error Log for|ELMAH",
        html_ok: true,
    },
    PathRule {
        path: "_profiler/phpinfo",
        label: "Symfony profiler",
        severity: Severity::High,
        shape: r"Symfony Profiler|PHP Version",
        html_ok: true,
    },
];

pub struct AdminPathProbe;

#[async_trait]
impl Probe for AdminPathProbe {
    fn id(&self) -> &str {
        "exposed-path"
    }

    async fn run(
        &self,
        client: &HttpClient,
        ctx: &ProbeContext,
    ) -> Result<Vec<VulnerabilityFinding>> {
        let baseline = Soft404Baseline::establish(client, &ctx.target.origin).await;

        // Indexing into the table keeps the stream closure free of borrowed
        // arguments, which the Send bound on the probe future requires
        let findings: Vec<VulnerabilityFinding> = stream::iter(0..PATH_RULES.len())
            .map(|index| {
                let client = client.clone();
                let baseline = baseline.clone();
                let url = ctx.target.url_for(PATH_RULES[index].path);
                let probe_id = self.id().to_string();
                async move { check_path(&client, &baseline, &PATH_RULES[index], &url, &probe_id).await }
            })
            .buffer_unordered(ctx.config.path_batch_size)
            .filter_map(|r| async { r })
            .collect()
            .await;

        Ok(findings)
    }
}

async fn check_path(
    client: &HttpClient,
    baseline: &Soft404Baseline,
    rule: &PathRule,
    url: &str,
    probe_id: &str,
) -> Option<VulnerabilityFinding> {
    let response = client.get(url).await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    let body = response.text().await.ok()?;

    if baseline.matches(&body) {
        debug!("{url}: matched soft-404 baseline");
        return None;
    }
    if !rule.html_ok && is_html_document(&body) {
        debug!("{url}: html document where raw content was expected");
        return None;
    }
    let shape = Regex::new(rule.shape).ok()?;
    if !shape.is_match(&body) {
        debug!("{url}: content shape mismatch for {}", rule.label);
        return None;
    }

    let slug = rule.path.replace(['/', '.'], "-").trim_matches('-').to_string();
    Some(
        VulnerabilityFinding::new(
            format!("{probe_id}-{slug}"),
            format!("Exposed {}", rule.label),
            rule.severity.clone(),
            "Exposed Paths",
            format!("{} is publicly reachable at {url}.", rule.label),
            url,
        )
        .with_remediation("Restrict the path behind authentication or remove it from production.")
        .with_cwe("CWE-552"),
    )
}
