//! Recommended security-header evaluation

use crate::http::FetchedPage;
use crate::models::{HeaderCheck, Severity, VulnerabilityFinding};
use tracing::debug;

struct RecommendedHeader {
    name: &'static str,
    severity: Severity,
    cwe: &'static str,
    recommendation: &'static str,
}

/// Headers every check run evaluates; each absent entry carries a fixed
/// scoring penalty downstream plus a finding at the listed severity.
const RECOMMENDED: &[RecommendedHeader] = &[
    RecommendedHeader {
        name: "strict-transport-security",
        severity: Severity::High,
        cwe: "CWE-319",
        recommendation: "Add 'Strict-Transport-Security: max-age=31536000; includeSubDomains'.",
    },
    RecommendedHeader {
        name: "content-security-policy",
        severity: Severity::Medium,
        cwe: "CWE-693",
        recommendation: "Implement a strict Content-Security-Policy without 'unsafe-inline' or 'unsafe-eval'.",
    },
    RecommendedHeader {
        name: "x-content-type-options",
        severity: Severity::Low,
        cwe: "CWE-693",
        recommendation: "Add 'X-Content-Type-Options: nosniff'.",
    },
    RecommendedHeader {
        name: "x-frame-options",
        severity: Severity::Medium,
        cwe: "CWE-1021",
        recommendation: "Add 'X-Frame-Options: DENY' or 'SAMEORIGIN' to prevent clickjacking.",
    },
    RecommendedHeader {
        name: "referrer-policy",
        severity: Severity::Low,
        cwe: "CWE-200",
        recommendation: "Add 'Referrer-Policy: strict-origin-when-cross-origin'.",
    },
    RecommendedHeader {
        name: "permissions-policy",
        severity: Severity::Low,
        cwe: "CWE-693",
        recommendation: "Add a Permissions-Policy header restricting browser features.",
    },
];

/// Evaluates the recommended-header table against the captured response.
/// One entry per table row, present or not.
pub fn check_headers(page: &FetchedPage) -> Vec<HeaderCheck> {
    RECOMMENDED
        .iter()
        .map(|rec| {
            let value = page.header(rec.name).map(str::to_string);
            debug!("header '{}': {:?}", rec.name, value.as_deref());
            HeaderCheck {
                name: rec.name.to_string(),
                present: value.is_some(),
                value,
                recommendation: if page.header(rec.name).is_some() {
                    None
                } else {
                    Some(rec.recommendation.to_string())
                },
            }
        })
        .collect()
}

/// Findings for missing recommended headers, present-but-weak values, and
/// version disclosure
pub fn header_findings(page: &FetchedPage, origin: &str) -> Vec<VulnerabilityFinding> {
    let mut findings = Vec::new();

    for rec in RECOMMENDED {
        if page.header(rec.name).is_none() {
            findings.push(
                VulnerabilityFinding::new(
                    format!("missing-header-{}", rec.name),
                    format!("Missing {} Header", rec.name),
                    rec.severity.clone(),
                    "Security Headers",
                    format!("The response does not set the {} header.", rec.name),
                    origin,
                )
                .with_remediation(rec.recommendation)
                .with_cwe(rec.cwe),
            );
        }
    }

    if let Some(csp) = page.header("content-security-policy") {
        if csp.contains("unsafe-inline") || csp.contains("unsafe-eval") {
            findings.push(
                VulnerabilityFinding::new(
                    "weak-csp",
                    "Weak Content-Security-Policy",
                    Severity::Medium,
                    "Security Headers",
                    format!("CSP contains unsafe directives: {csp}"),
                    origin,
                )
                .with_remediation(
                    "Remove 'unsafe-inline' and 'unsafe-eval' from the Content-Security-Policy.",
                )
                .with_cwe("CWE-693"),
            );
        }
    }

    if let Some(hsts) = page.header("strict-transport-security") {
        if let Some(detail) = weak_hsts(hsts) {
            findings.push(
                VulnerabilityFinding::new(
                    "weak-hsts",
                    "Weak Strict-Transport-Security",
                    Severity::Low,
                    "Security Headers",
                    detail,
                    origin,
                )
                .with_remediation(
                    "Set 'Strict-Transport-Security: max-age=31536000; includeSubDomains'.",
                )
                .with_cwe("CWE-319"),
            );
        }
    }

    if let Some(server) = page.header("server") {
        if server.chars().any(|c| c.is_ascii_digit()) {
            findings.push(
                VulnerabilityFinding::new(
                    "server-version-disclosure",
                    "Server Header Version Disclosure",
                    Severity::Low,
                    "Security Headers",
                    format!("Server header reveals version: {server}"),
                    origin,
                )
                .with_remediation("Remove or genericize the Server header.")
                .with_cwe("CWE-200"),
            );
        }
    }

    if let Some(powered) = page.header("x-powered-by") {
        findings.push(
            VulnerabilityFinding::new(
                "x-powered-by-disclosure",
                "X-Powered-By Technology Disclosure",
                Severity::Low,
                "Security Headers",
                format!("X-Powered-By reveals the technology stack: {powered}"),
                origin,
            )
            .with_remediation("Remove the X-Powered-By header from responses.")
            .with_cwe("CWE-200"),
        );
    }

    findings
}

fn weak_hsts(value: &str) -> Option<String> {
    let max_age = value
        .split(';')
        .find_map(|part| part.trim().strip_prefix("max-age="))?;
    match max_age.trim().parse::<u64>() {
        Ok(age) if age < 31_536_000 => {
            Some(format!("HSTS max-age is {age} (should be >= 31536000)"))
        }
        Ok(_) if !value.to_lowercase().contains("includesubdomains") => {
            Some("HSTS missing includeSubDomains directive".to_string())
        }
        Ok(_) => None,
        Err(_) => Some(format!("Invalid HSTS max-age: {value}")),
    }
}

/// Whether the response signature indicates a reverse proxy or CDN in front
/// of the origin. Consulted when flagging proxy-port exposure.
pub fn behind_proxy(page: &FetchedPage) -> bool {
    if page.header("via").is_some()
        || page.header("cf-ray").is_some()
        || page.header("x-cache").is_some()
    {
        return true;
    }
    page.header("server")
        .map(|s| {
            let s = s.to_lowercase();
            s.contains("cloudflare") || s.contains("cloudfront") || s.contains("varnish")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn page_with(headers: &[(&str, &str)]) -> FetchedPage {
        FetchedPage {
            final_url: "https://example.com/".to_string(),
            status: 200,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            body: String::new(),
            cookies: Vec::new(),
            redirect_chain: Vec::new(),
        }
    }

    #[test]
    fn bare_response_marks_every_header_absent() {
        let checks = check_headers(&page_with(&[]));
        assert_eq!(checks.len(), RECOMMENDED.len());
        assert!(checks.iter().all(|c| !c.present));
        assert!(checks.iter().all(|c| c.recommendation.is_some()));
    }

    #[test]
    fn present_header_carries_value_and_no_recommendation() {
        let checks = check_headers(&page_with(&[(
            "strict-transport-security",
            "max-age=63072000; includeSubDomains",
        )]));
        let hsts = checks
            .iter()
            .find(|c| c.name == "strict-transport-security")
            .unwrap();
        assert!(hsts.present);
        assert!(hsts.recommendation.is_none());
    }

    #[test]
    fn missing_headers_produce_findings_at_listed_severities() {
        let findings = header_findings(&page_with(&[]), "https://example.com");
        assert_eq!(findings.len(), RECOMMENDED.len());
        let hsts = findings
            .iter()
            .find(|f| f.id == "missing-header-strict-transport-security")
            .unwrap();
        assert_eq!(hsts.severity, Severity::High);
    }

    #[test]
    fn unsafe_csp_yields_weak_finding() {
        let page = page_with(&[("content-security-policy", "script-src 'unsafe-inline'")]);
        let findings = header_findings(&page, "https://example.com");
        assert!(findings.iter().any(|f| f.id == "weak-csp"));
    }

    #[test]
    fn short_hsts_max_age_is_flagged() {
        assert!(weak_hsts("max-age=300").is_some());
        assert!(weak_hsts("max-age=31536000; includeSubDomains").is_none());
    }

    #[test]
    fn proxy_detection_reads_signature_headers() {
        assert!(behind_proxy(&page_with(&[("cf-ray", "abc123")])));
        assert!(behind_proxy(&page_with(&[("server", "cloudflare")])));
        assert!(!behind_proxy(&page_with(&[("server", "nginx")])));
    }
}
