//! Core data models for the Vigil audit engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for audit findings.
///
/// Derives `Ord` with `Critical` first so an ascending sort yields the
/// report order critical, high, medium, low, info.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::High => write!(f, "HIGH"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::Low => write!(f, "LOW"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

/// Raw caller input for one audit run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRequest {
    pub target: String,
}

/// Presence check for one recommended security header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderCheck {
    pub name: String,
    pub present: bool,
    pub value: Option<String>,
    /// Remediation text, set when the header is absent
    pub recommendation: Option<String>,
}

/// Observed state of a probed TCP port
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PortState {
    Open,
    Closed,
    Filtered,
}

/// Result of probing one TCP port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortResult {
    pub port: u16,
    pub service: String,
    pub state: PortState,
    pub banner: Option<String>,
    pub risk: Severity,
}

/// Collected TLS session and certificate data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsResult {
    pub protocol: String,
    pub cipher: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub issuer: String,
    pub subject: String,
    pub days_until_expiry: i64,
    pub grade: String,
    /// Subject alternative names, capped at 20
    pub sans: Vec<String>,
    pub serial: String,
}

/// DNS record classification tag
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DnsRecordType {
    A,
    Aaaa,
    Mx,
    Ns,
    Txt,
    Cname,
    Soa,
    Spf,
    Dmarc,
    Dkim,
}

impl fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            DnsRecordType::A => "A",
            DnsRecordType::Aaaa => "AAAA",
            DnsRecordType::Mx => "MX",
            DnsRecordType::Ns => "NS",
            DnsRecordType::Txt => "TXT",
            DnsRecordType::Cname => "CNAME",
            DnsRecordType::Soa => "SOA",
            DnsRecordType::Spf => "SPF",
            DnsRecordType::Dmarc => "DMARC",
            DnsRecordType::Dkim => "DKIM",
        };
        write!(f, "{tag}")
    }
}

/// One resolved DNS record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsRecord {
    pub record_type: DnsRecordType,
    pub value: String,
}

impl DnsRecord {
    pub fn new(record_type: DnsRecordType, value: impl Into<String>) -> Self {
        Self {
            record_type,
            value: value.into(),
        }
    }
}

/// Security posture of one observed cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieCheck {
    pub name: String,
    /// Raw cookie value, kept for token-shape inspection
    pub value: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<String>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub issues: Vec<String>,
}

/// A vulnerability discovered by one of the probes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityFinding {
    /// Deterministic kebab-case id, stable for the same input and probe outcome
    pub id: String,
    pub title: String,
    pub severity: Severity,
    pub category: String,
    pub description: String,
    pub remediation: String,
    /// Component the finding applies to (URL, port, header, record)
    pub affected: String,
    pub cvss: Option<f32>,
    pub cwe: Option<String>,
}

impl VulnerabilityFinding {
    /// Creates a new finding; the id must be stable across runs for the
    /// same probe outcome so downstream consumers can deduplicate.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        severity: Severity,
        category: impl Into<String>,
        description: impl Into<String>,
        affected: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            severity,
            category: category.into(),
            description: description.into(),
            remediation: String::new(),
            affected: affected.into(),
            cvss: None,
            cwe: None,
        }
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = remediation.into();
        self
    }

    pub fn with_cvss(mut self, cvss: f32) -> Self {
        self.cvss = Some(cvss);
        self
    }

    pub fn with_cwe(mut self, cwe: impl Into<String>) -> Self {
        self.cwe = Some(cwe.into());
        self
    }
}

/// Result of one regulatory/best-practice check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceCheck {
    pub name: String,
    pub passed: bool,
    pub detail: String,
    pub category: String,
}

/// Category of an exposed-source leak
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LeakKind {
    VersionControl,
    EnvFile,
    SourceMap,
    Backup,
    Manifest,
    Debug,
    DirectoryListing,
}

/// A verified source or configuration leak
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceLeakFinding {
    pub id: String,
    pub kind: LeakKind,
    pub url: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    /// Content excerpt with secret substrings redacted
    pub excerpt: Option<String>,
    pub remediation: String,
}

/// Aggregate result of a complete audit run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResult {
    pub target: String,
    pub origin: String,
    pub reachable: bool,
    /// Human-readable reason when the target was unreachable
    pub error: Option<String>,
    pub status_code: Option<u16>,
    pub redirect_chain: Vec<String>,
    pub server_header: Option<String>,
    pub technology_headers: Vec<(String, String)>,
    pub header_checks: Vec<HeaderCheck>,
    pub ports: Vec<PortResult>,
    pub tls: Option<TlsResult>,
    pub dns_records: Vec<DnsRecord>,
    pub cookies: Vec<CookieCheck>,
    pub findings: Vec<VulnerabilityFinding>,
    pub compliance: Vec<ComplianceCheck>,
    pub leaks: Vec<SourceLeakFinding>,
    /// Deterministic risk score, always within [0, 100]
    pub score: u8,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl AuditResult {
    /// Creates an empty, reachable result shell for a target
    pub fn new(target: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            origin: origin.into(),
            reachable: true,
            error: None,
            status_code: None,
            redirect_chain: Vec::new(),
            server_header: None,
            technology_headers: Vec::new(),
            header_checks: Vec::new(),
            ports: Vec::new(),
            tls: None,
            dns_records: Vec::new(),
            cookies: Vec::new(),
            findings: Vec::new(),
            compliance: Vec::new(),
            leaks: Vec::new(),
            score: 100,
            started_at: Utc::now(),
            elapsed_ms: 0,
        }
    }

    /// Standardized report for a target that could not be fetched.
    /// This is a successful call carrying a negative result.
    pub fn unreachable(target: impl Into<String>, reason: impl Into<String>) -> Self {
        let target = target.into();
        let mut result = Self::new(target.clone(), target);
        result.reachable = false;
        result.error = Some(reason.into());
        result.score = 0;
        result
    }

    /// Best-effort empty report paired with a structural error
    pub fn empty(target: impl Into<String>) -> Self {
        let target = target.into();
        let mut result = Self::new(target.clone(), target);
        result.reachable = false;
        result.score = 0;
        result
    }

    /// Returns count of findings at a given severity
    pub fn count_by_severity(&self, severity: &Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| &f.severity == severity)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_critical_first() {
        let mut severities = vec![
            Severity::Low,
            Severity::Critical,
            Severity::Info,
            Severity::High,
            Severity::Medium,
        ];
        severities.sort();
        assert_eq!(
            severities,
            vec![
                Severity::Critical,
                Severity::High,
                Severity::Medium,
                Severity::Low,
                Severity::Info,
            ]
        );
    }

    #[test]
    fn unreachable_result_is_well_formed() {
        let result = AuditResult::unreachable("https://down.example", "connection refused");
        assert!(!result.reachable);
        assert_eq!(result.error.as_deref(), Some("connection refused"));
        assert_eq!(result.score, 0);
        assert!(result.findings.is_empty());
    }
}
