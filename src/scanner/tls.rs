//! TLS session and certificate inspection.
//!
//! Connects without chain validation: the goal is data collection and
//! grading, not trust establishment. Any failure yields an absent result.

use crate::config::AuditConfig;
use crate::models::TlsResult;
use chrono::{DateTime, Utc};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::{debug, info, warn};
use x509_parser::prelude::*;

/// Maximum subject-alternative-names carried into the report
const MAX_SANS: usize = 20;

/// Certificate verifier that accepts any chain; inspection only
#[derive(Debug)]
struct AcceptAny {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAny {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Inspects the TLS endpoint of a host. Returns None on any connection or
/// parse failure; TLS data is enrichment, never a run-aborting dependency.
pub async fn inspect_tls(host: &str, port: u16, config: &AuditConfig) -> Option<TlsResult> {
    match timeout(config.http_timeout(), handshake_and_extract(host, port)).await {
        Ok(Ok(result)) => {
            info!(
                "tls inspection for {host}: {} / {} grade {}",
                result.protocol, result.cipher, result.grade
            );
            Some(result)
        }
        Ok(Err(e)) => {
            warn!("tls inspection failed for {host}:{port}: {e}");
            None
        }
        Err(_) => {
            warn!("tls inspection timed out for {host}:{port}");
            None
        }
    }
}

async fn handshake_and_extract(host: &str, port: u16) -> Result<TlsResult, String> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let tls_config = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| format!("tls config: {e}"))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAny { provider }))
        .with_no_client_auth();

    let connector = TlsConnector::from(Arc::new(tls_config));
    let server_name =
        ServerName::try_from(host.to_string()).map_err(|e| format!("server name: {e}"))?;

    let tcp = TcpStream::connect((host, port))
        .await
        .map_err(|e| format!("tcp connect: {e}"))?;
    let stream = connector
        .connect(server_name, tcp)
        .await
        .map_err(|e| format!("handshake: {e}"))?;

    let (_, session) = stream.get_ref();

    let protocol = match session.protocol_version() {
        Some(rustls::ProtocolVersion::TLSv1_3) => "TLS 1.3".to_string(),
        Some(rustls::ProtocolVersion::TLSv1_2) => "TLS 1.2".to_string(),
        Some(other) => format!("{other:?}"),
        None => "unknown".to_string(),
    };
    let cipher = session
        .negotiated_cipher_suite()
        .map(|s| format!("{:?}", s.suite()))
        .unwrap_or_else(|| "unknown".to_string());

    let cert_der = session
        .peer_certificates()
        .and_then(|certs| certs.first())
        .ok_or_else(|| "no peer certificate".to_string())?;

    let (_, x509) = parse_x509_certificate(cert_der.as_ref())
        .map_err(|e| format!("x509 parse: {e}"))?;

    let validity = x509.validity();
    let not_before = asn1_to_utc(&validity.not_before);
    let not_after = asn1_to_utc(&validity.not_after);
    let days_until_expiry = not_after.signed_duration_since(Utc::now()).num_days();

    let sans = extract_sans(&x509);
    debug!("certificate has {} SANs (capped at {MAX_SANS})", sans.len());

    let grade = grade(&protocol, &cipher, days_until_expiry);

    Ok(TlsResult {
        protocol,
        cipher,
        not_before,
        not_after,
        issuer: x509.issuer().to_string(),
        subject: x509.subject().to_string(),
        days_until_expiry,
        grade: grade.to_string(),
        sans,
        serial: x509.raw_serial_as_string(),
    })
}

fn asn1_to_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}

fn extract_sans(cert: &X509Certificate<'_>) -> Vec<String> {
    let mut sans = Vec::new();
    if let Ok(Some(ext)) = cert.subject_alternative_name() {
        for name in &ext.value.general_names {
            if let GeneralName::DNSName(dns) = name {
                sans.push(dns.to_string());
                if sans.len() >= MAX_SANS {
                    break;
                }
            }
        }
    }
    sans
}

/// Letter grade for the negotiated session; rules evaluated in order,
/// expiry always dominating protocol.
pub fn grade(protocol: &str, cipher: &str, days_until_expiry: i64) -> &'static str {
    if days_until_expiry <= 0 {
        return "F";
    }
    match protocol {
        "TLS 1.3" => {
            if days_until_expiry > 30 && cipher.contains("AES") {
                "A+"
            } else {
                "A"
            }
        }
        "TLS 1.2" => {
            if days_until_expiry > 30 {
                "B"
            } else {
                "B-"
            }
        }
        "TLS 1.1" | "TLS 1.0" => "F",
        _ => "C",
    }
}

/// Findings derived from the inspected session and certificate
pub fn tls_findings(tls: &TlsResult, host: &str) -> Vec<crate::models::VulnerabilityFinding> {
    use crate::models::{Severity, VulnerabilityFinding};
    let mut findings = Vec::new();

    if tls.days_until_expiry <= 0 {
        findings.push(
            VulnerabilityFinding::new(
                "tls-certificate-expired",
                "TLS Certificate Expired",
                Severity::Critical,
                "Transport Security",
                format!(
                    "The certificate expired {} day(s) ago (not_after {}).",
                    -tls.days_until_expiry, tls.not_after
                ),
                host,
            )
            .with_remediation("Renew the certificate and automate rotation.")
            .with_cwe("CWE-324"),
        );
    } else if tls.days_until_expiry <= 14 {
        findings.push(
            VulnerabilityFinding::new(
                "tls-certificate-expiring",
                "TLS Certificate Expiring Soon",
                Severity::Low,
                "Transport Security",
                format!("The certificate expires in {} day(s).", tls.days_until_expiry),
                host,
            )
            .with_remediation("Renew the certificate before it lapses."),
        );
    }

    if tls.grade == "F" && tls.days_until_expiry > 0 {
        findings.push(
            VulnerabilityFinding::new(
                "tls-obsolete-protocol",
                "Obsolete TLS Protocol Negotiated",
                Severity::High,
                "Transport Security",
                format!("The server negotiated {} by default.", tls.protocol),
                host,
            )
            .with_remediation("Require TLS 1.2 or newer.")
            .with_cwe("CWE-326"),
        );
    }

    findings
}
