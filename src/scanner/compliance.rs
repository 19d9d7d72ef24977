//! Regulatory and best-practice heuristics.
//!
//! Every check is an independent boolean plus a detail string. Cookie
//! consent is the hardest case: heterogeneous implementations mean a single
//! signal misses real banners, so the verdict ORs several signal classes and
//! the detail records exactly which ones fired.

use crate::http::{FetchedPage, HttpClient};
use crate::models::{ComplianceCheck, HeaderCheck};
use crate::target::Target;
use tracing::{debug, info};

/// Body keywords common to consent banners
const CONSENT_KEYWORDS: &[&str] = &[
    "cookie consent",
    "accept all cookies",
    "accept cookies",
    "we use cookies",
    "cookie settings",
    "cookie preferences",
    "manage cookies",
];

/// Script origins of known consent-management platforms
const CONSENT_PLATFORMS: &[&str] = &[
    "cookiebot.com",
    "onetrust.com",
    "cdn.cookielaw.org",
    "usercentrics.eu",
    "quantcast.com/choice",
    "iubenda.com",
    "termly.io",
    "cookieyes.com",
    "trustarc.com",
];

/// Consent-state cookie name patterns
const CONSENT_COOKIE_NAMES: &[&str] = &[
    "cookieconsent",
    "cookie_consent",
    "euconsent",
    "optanonconsent",
    "cookieyes-consent",
    "cc_cookie",
];

/// Embedded client-state markers left by consent libraries
const CONSENT_STATE_MARKERS: &[&str] = &[
    "__tcfapi",
    "OneTrust",
    "Cookiebot",
    "CookieConsent",
    "usercentrics",
    "didomi",
];

/// Endpoints consent platforms commonly serve their config from
const CONSENT_ENDPOINTS: &[&str] = &["cookie-policy", "cookies", "consent"];

/// Paths that indicate published legal notices
const LEGAL_PATHS: &[&str] = &["privacy", "privacy-policy", "legal", "imprint", "terms"];

/// Runs every compliance check against the captured artifacts
pub async fn run_checks(
    client: &HttpClient,
    target: &Target,
    page: &FetchedPage,
    header_checks: &[HeaderCheck],
) -> Vec<ComplianceCheck> {
    let mut checks = Vec::new();

    checks.push(cookie_consent(client, target, page).await);
    checks.push(legal_notices(page));
    checks.push(security_txt(client, target).await);
    checks.push(header_posture(header_checks));
    checks.push(cookie_posture(page));

    info!(
        "compliance: {}/{} checks passed",
        checks.iter().filter(|c| c.passed).count(),
        checks.len()
    );
    checks
}

/// OR-combined multi-signal consent detection, recording fired signals
async fn cookie_consent(client: &HttpClient, target: &Target, page: &FetchedPage) -> ComplianceCheck {
    let lower = page.body.to_lowercase();
    let mut fired: Vec<String> = Vec::new();

    if let Some(kw) = CONSENT_KEYWORDS.iter().find(|kw| lower.contains(*kw)) {
        fired.push(format!("body keyword '{kw}'"));
    }
    if let Some(platform) = CONSENT_PLATFORMS.iter().find(|p| lower.contains(*p)) {
        fired.push(format!("consent platform script '{platform}'"));
    }
    if let Some(cookie) = page.cookies.iter().find(|c| {
        let name = c.name.to_lowercase();
        CONSENT_COOKIE_NAMES.iter().any(|m| name.contains(m))
    }) {
        fired.push(format!("consent cookie '{}'", cookie.name));
    }
    if let Some(marker) = CONSENT_STATE_MARKERS
        .iter()
        .find(|m| page.body.contains(*m))
    {
        fired.push(format!("client-state marker '{marker}'"));
    }

    // Active probe only when passive signals found nothing
    if fired.is_empty() {
        for endpoint in CONSENT_ENDPOINTS {
            let url = target.url_for(endpoint);
            if let Ok(response) = client.get(&url).await {
                if response.status().is_success() {
                    debug!("consent endpoint answered: {url}");
                    fired.push(format!("consent endpoint '/{endpoint}'"));
                    break;
                }
            }
        }
    }

    let passed = !fired.is_empty();
    ComplianceCheck {
        name: "cookie-consent".to_string(),
        passed,
        detail: if passed {
            format!("consent mechanism detected via: {}", fired.join(", "))
        } else {
            "no consent banner, platform script, consent cookie, state marker, \
             or consent endpoint detected"
                .to_string()
        },
        category: "Privacy".to_string(),
    }
}

fn legal_notices(page: &FetchedPage) -> ComplianceCheck {
    let lower = page.body.to_lowercase();
    let found: Vec<&str> = LEGAL_PATHS
        .iter()
        .filter(|path| lower.contains(&format!("/{path}")) || lower.contains(&format!(">{path}")))
        .copied()
        .collect();

    let passed = !found.is_empty();
    ComplianceCheck {
        name: "legal-notices".to_string(),
        passed,
        detail: if passed {
            format!("legal notice links present: {}", found.join(", "))
        } else {
            "no privacy policy, terms, or imprint links found on the page".to_string()
        },
        category: "Privacy".to_string(),
    }
}

async fn security_txt(client: &HttpClient, target: &Target) -> ComplianceCheck {
    let url = target.url_for("/.well-known/security.txt");
    let found = match client.get(&url).await {
        Ok(response) if response.status().is_success() => {
            let body = response.text().await.unwrap_or_default();
            // RFC 9116 requires a Contact field
            body.contains("Contact:")
        }
        _ => false,
    };

    ComplianceCheck {
        name: "security-txt".to_string(),
        passed: found,
        detail: if found {
            format!("security.txt with a Contact field served at {url}")
        } else {
            "no RFC 9116 security.txt published under /.well-known/".to_string()
        },
        category: "Disclosure Policy".to_string(),
    }
}

fn header_posture(header_checks: &[HeaderCheck]) -> ComplianceCheck {
    let missing: Vec<&str> = header_checks
        .iter()
        .filter(|h| !h.present)
        .map(|h| h.name.as_str())
        .collect();

    let passed = missing.is_empty();
    ComplianceCheck {
        name: "security-headers".to_string(),
        passed,
        detail: if passed {
            "all recommended security headers are present".to_string()
        } else {
            format!("missing headers: {}", missing.join(", "))
        },
        category: "Configuration".to_string(),
    }
}

fn cookie_posture(page: &FetchedPage) -> ComplianceCheck {
    let flagged: Vec<String> = page
        .cookies
        .iter()
        .filter(|c| !c.issues.is_empty())
        .map(|c| format!("{} ({})", c.name, c.issues.join("; ")))
        .collect();

    let passed = flagged.is_empty();
    ComplianceCheck {
        name: "cookie-flags".to_string(),
        passed,
        detail: if passed {
            "all observed cookies carry protective flags".to_string()
        } else {
            format!("cookies with issues: {}", flagged.join(", "))
        },
        category: "Configuration".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CookieCheck;
    use std::collections::HashMap;

    fn page(body: &str, cookies: Vec<CookieCheck>) -> FetchedPage {
        FetchedPage {
            final_url: "https://example.com/".to_string(),
            status: 200,
            headers: HashMap::new(),
            body: body.to_string(),
            cookies,
            redirect_chain: Vec::new(),
        }
    }

    #[test]
    fn legal_links_are_detected() {
        let check = legal_notices(&page(
            r#"<a href="/privacy-policy">Privacy</a>"#,
            Vec::new(),
        ));
        assert!(check.passed);
        assert!(check.detail.contains("privacy"));
    }

    #[test]
    fn missing_headers_fail_the_posture_check() {
        let checks = vec![HeaderCheck {
            name: "content-security-policy".to_string(),
            present: false,
            value: None,
            recommendation: Some("add it".to_string()),
        }];
        let check = header_posture(&checks);
        assert!(!check.passed);
        assert!(check.detail.contains("content-security-policy"));
    }

    #[test]
    fn cookie_issues_fail_the_cookie_check() {
        let cookies = vec![CookieCheck {
            name: "sessionid".to_string(),
            value: "abc123".to_string(),
            secure: false,
            http_only: true,
            same_site: None,
            path: None,
            domain: None,
            issues: vec!["missing Secure flag".to_string()],
        }];
        let check = cookie_posture(&page("", cookies));
        assert!(!check.passed);
        assert!(check.detail.contains("sessionid"));
    }
}
