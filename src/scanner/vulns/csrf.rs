//! CSRF posture probe.
//!
//! Tri-state verdict: vulnerable (forms, no token, no modern defense),
//! modern-protected (no token but SameSite cookies or a CSP form-action
//! restriction), or not applicable (no forms at all).

use super::{Probe, ProbeContext};
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::{Severity, VulnerabilityFinding};
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

/// Known CSRF token field-name markers
const TOKEN_MARKERS: &[&str] = &[
    "csrf",
    "_token",
    "csrfmiddlewaretoken",
    "authenticity_token",
    "__requestverificationtoken",
    "antiforgerytoken",
    "xsrf",
    "nonce",
];

pub struct CsrfProbe;

#[async_trait]
impl Probe for CsrfProbe {
    fn id(&self) -> &str {
        "csrf-posture"
    }

    async fn run(
        &self,
        _client: &HttpClient,
        ctx: &ProbeContext,
    ) -> Result<Vec<VulnerabilityFinding>> {
        let posture = classify(ctx);

        let finding = match posture {
            CsrfPosture::NotApplicable => {
                debug!("no forms on the captured page, csrf check not applicable");
                return Ok(Vec::new());
            }
            CsrfPosture::TokenProtected => {
                debug!("form token markers present");
                return Ok(Vec::new());
            }
            CsrfPosture::ModernDefense(defense) => VulnerabilityFinding::new(
                format!("{}-modern-defense", self.id()),
                "Forms Rely on Modern CSRF Defenses",
                Severity::Info,
                "CSRF",
                format!(
                    "Forms carry no CSRF token field, but the response applies a \
                     modern defense ({defense})."
                ),
                &ctx.page.final_url,
            )
            .with_remediation(
                "No action required if the defense covers every state-changing form; \
                 consider adding tokens for defense in depth.",
            )
            .with_cwe("CWE-352"),
            CsrfPosture::Vulnerable => VulnerabilityFinding::new(
                format!("{}-missing-token", self.id()),
                "Forms Without CSRF Protection",
                Severity::Medium,
                "CSRF",
                "Forms are present with no CSRF token field and no SameSite cookie \
                 or CSP form-action restriction."
                    .to_string(),
                &ctx.page.final_url,
            )
            .with_remediation(
                "Add a per-session CSRF token to all state-changing forms, or set \
                 SameSite=Lax/Strict on session cookies.",
            )
            .with_cwe("CWE-352")
            .with_cvss(6.5),
        };

        Ok(vec![finding])
    }
}

enum CsrfPosture {
    NotApplicable,
    TokenProtected,
    ModernDefense(&'static str),
    Vulnerable,
}

fn classify(ctx: &ProbeContext) -> CsrfPosture {
    if !page_has_forms(&ctx.page.body) {
        return CsrfPosture::NotApplicable;
    }
    if body_has_token_marker(&ctx.page.body) {
        return CsrfPosture::TokenProtected;
    }
    if ctx
        .page
        .cookies
        .iter()
        .any(|c| {
            c.same_site
                .as_deref()
                .map(|s| s.eq_ignore_ascii_case("lax") || s.eq_ignore_ascii_case("strict"))
                .unwrap_or(false)
        })
    {
        return CsrfPosture::ModernDefense("SameSite session cookies");
    }
    if ctx
        .page
        .header("content-security-policy")
        .map(|csp| csp.contains("form-action"))
        .unwrap_or(false)
    {
        return CsrfPosture::ModernDefense("CSP form-action restriction");
    }
    CsrfPosture::Vulnerable
}

fn page_has_forms(html: &str) -> bool {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("form") {
        Ok(s) => s,
        Err(_) => return false,
    };
    document.select(&selector).next().is_some()
}

fn body_has_token_marker(html: &str) -> bool {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("form input") {
        Ok(s) => s,
        Err(_) => return false,
    };
    document.select(&selector).any(|input| {
        let name = input
            .value()
            .attr("name")
            .unwrap_or_default()
            .to_lowercase();
        TOKEN_MARKERS.iter().any(|marker| name.contains(marker))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_field_is_recognized() {
        let html = r#"<form method="post">
            <input type="hidden" name="csrfmiddlewaretoken" value="abc">
            <input name="email"></form>"#;
        assert!(body_has_token_marker(html));
    }

    #[test]
    fn plain_form_has_no_marker() {
        let html = r#"<form method="post"><input name="email"></form>"#;
        assert!(page_has_forms(html));
        assert!(!body_has_token_marker(html));
    }

    #[test]
    fn formless_page_is_not_applicable() {
        assert!(!page_has_forms("<html><body><p>hello</p></body></html>"));
    }
}
