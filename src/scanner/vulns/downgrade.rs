//! TLS downgrade probe: handshakes pinned to obsolete protocol versions.
//! A completed handshake is itself the finding.

use super::{Probe, ProbeContext};
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::{Severity, VulnerabilityFinding};
use async_trait::async_trait;
use native_tls::Protocol;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

const OBSOLETE_VERSIONS: &[(Protocol, &str, &str)] = &[
    (Protocol::Tlsv10, "TLS 1.0", "tls-1-0"),
    (Protocol::Tlsv11, "TLS 1.1", "tls-1-1"),
];

pub struct DowngradeProbe;

#[async_trait]
impl Probe for DowngradeProbe {
    fn id(&self) -> &str {
        "tls-downgrade"
    }

    async fn run(
        &self,
        _client: &HttpClient,
        ctx: &ProbeContext,
    ) -> Result<Vec<VulnerabilityFinding>> {
        if ctx.target.scheme != "https" {
            return Ok(Vec::new());
        }

        let host = ctx.target.host.clone();
        let port = ctx.target.effective_port();
        let mut findings = Vec::new();

        for (version, label, slug) in OBSOLETE_VERSIONS {
            let accepted = timeout(
                ctx.config.http_timeout(),
                negotiate_pinned(&host, port, *version),
            )
            .await
            .unwrap_or(false);

            debug!("{label} handshake against {host}:{port}: accepted={accepted}");
            if accepted {
                findings.push(
                    VulnerabilityFinding::new(
                        format!("{}-{slug}", self.id()),
                        format!("Server Accepts {label}"),
                        Severity::Medium,
                        "Transport Security",
                        format!(
                            "A handshake pinned to {label} completed successfully. \
                             {label} is deprecated and vulnerable to downgrade attacks."
                        ),
                        format!("{host}:{port}"),
                    )
                    .with_remediation("Disable TLS versions below 1.2 in the server configuration.")
                    .with_cwe("CWE-326"),
                );
            }
        }

        Ok(findings)
    }
}

/// Attempts a handshake with both protocol bounds pinned to one version
async fn negotiate_pinned(host: &str, port: u16, version: Protocol) -> bool {
    let connector = match native_tls::TlsConnector::builder()
        .min_protocol_version(Some(version))
        .max_protocol_version(Some(version))
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
    {
        Ok(connector) => tokio_native_tls::TlsConnector::from(connector),
        Err(_) => return false,
    };

    let Ok(tcp) = TcpStream::connect((host, port)).await else {
        return false;
    };
    connector.connect(host, tcp).await.is_ok()
}
