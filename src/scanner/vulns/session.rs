//! Session cookie and JWT posture probe

use super::{Probe, ProbeContext};
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::{CookieCheck, Severity, VulnerabilityFinding};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;
use tracing::debug;

/// Cookie-name fragments that mark a session or auth token
const SESSION_NAME_MARKERS: &[&str] = &[
    "session", "sess", "sid", "auth", "token", "jwt", "identity", "remember",
];

pub struct SessionProbe;

#[async_trait]
impl Probe for SessionProbe {
    fn id(&self) -> &str {
        "session-posture"
    }

    async fn run(
        &self,
        _client: &HttpClient,
        ctx: &ProbeContext,
    ) -> Result<Vec<VulnerabilityFinding>> {
        let mut findings = Vec::new();

        for cookie in session_cookies(&ctx.page.cookies) {
            if !cookie.issues.is_empty() {
                findings.push(
                    VulnerabilityFinding::new(
                        format!("{}-cookie-{}", self.id(), cookie.name.to_lowercase()),
                        format!("Session Cookie '{}' Lacks Protective Flags", cookie.name),
                        Severity::Medium,
                        "Session Management",
                        format!(
                            "Session cookie '{}' has issues: {}",
                            cookie.name,
                            cookie.issues.join(", ")
                        ),
                        &ctx.page.final_url,
                    )
                    .with_remediation(
                        "Set Secure, HttpOnly, and SameSite on all session cookies.",
                    )
                    .with_cwe("CWE-614"),
                );
            }

            if let Some(alg) = jwt_algorithm(&cookie.value) {
                debug!("jwt cookie '{}' uses alg {alg}", cookie.name);
                if alg.eq_ignore_ascii_case("none") {
                    findings.push(
                        VulnerabilityFinding::new(
                            format!("{}-jwt-alg-none", self.id()),
                            "JWT Accepts the 'none' Algorithm",
                            Severity::High,
                            "Session Management",
                            format!(
                                "Session token in cookie '{}' declares alg=none, meaning \
                                 the signature is not verified.",
                                cookie.name
                            ),
                            &ctx.page.final_url,
                        )
                        .with_remediation(
                            "Reject unsigned tokens and pin the expected signing algorithm \
                             server-side.",
                        )
                        .with_cwe("CWE-347")
                        .with_cvss(8.1),
                    );
                } else if alg.to_uppercase().starts_with("HS") {
                    findings.push(
                        VulnerabilityFinding::new(
                            format!("{}-jwt-symmetric", self.id()),
                            "JWT Signed With a Symmetric Scheme",
                            Severity::Low,
                            "Session Management",
                            format!(
                                "Session token in cookie '{}' is signed with {alg}; a \
                                 single shared secret both signs and verifies.",
                                cookie.name
                            ),
                            &ctx.page.final_url,
                        )
                        .with_remediation(
                            "Prefer an asymmetric signing scheme (RS256/ES256) so \
                             verifiers never hold the signing key.",
                        )
                        .with_cwe("CWE-327"),
                    );
                }
            }
        }

        Ok(findings)
    }
}

fn session_cookies(cookies: &[CookieCheck]) -> Vec<&CookieCheck> {
    cookies
        .iter()
        .filter(|c| {
            let name = c.name.to_lowercase();
            SESSION_NAME_MARKERS.iter().any(|m| name.contains(m))
        })
        .collect()
}

/// Decodes the header segment of a JWT-shaped value and returns its `alg`
fn jwt_algorithm(value: &str) -> Option<String> {
    if !value.starts_with("eyJ") {
        return None;
    }
    let mut segments = value.split('.');
    let header_segment = segments.next()?;
    // A JWT has exactly two more segments, the second possibly empty (alg none)
    segments.next()?;

    let decoded = URL_SAFE_NO_PAD.decode(header_segment).ok()?;
    let header: Value = serde_json::from_slice(&decoded).ok()?;
    header
        .get("alg")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CircuitBreaker;
    use crate::config::AuditConfig;
    use crate::http::{FetchedPage, HttpClient};
    use crate::target::Target;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn encode_header(json: &str) -> String {
        URL_SAFE_NO_PAD.encode(json.as_bytes())
    }

    fn cookie(name: &str, value: &str) -> CookieCheck {
        CookieCheck {
            name: name.to_string(),
            value: value.to_string(),
            secure: true,
            http_only: true,
            same_site: Some("lax".to_string()),
            path: None,
            domain: None,
            issues: vec![],
        }
    }

    #[test]
    fn alg_none_is_decoded() {
        let token = format!("{}.{}.", encode_header(r#"{"alg":"none"}"#), encode_header("{}"));
        assert_eq!(jwt_algorithm(&token).as_deref(), Some("none"));
    }

    #[test]
    fn hs256_is_decoded() {
        let token = format!(
            "{}.{}.sig",
            encode_header(r#"{"alg":"HS256","typ":"JWT"}"#),
            encode_header("{}")
        );
        assert_eq!(jwt_algorithm(&token).as_deref(), Some("HS256"));
    }

    #[test]
    fn non_jwt_values_are_ignored() {
        assert!(jwt_algorithm("abc123sessionvalue").is_none());
    }

    #[test]
    fn session_cookies_are_selected_by_name() {
        let cookies = vec![cookie("JSESSIONID", "abc"), cookie("theme", "dark")];
        let selected = session_cookies(&cookies);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "JSESSIONID");
    }

    #[tokio::test]
    async fn jwt_in_a_later_cookie_is_still_decoded() {
        let token = format!("{}.{}.", encode_header(r#"{"alg":"none"}"#), encode_header("{}"));
        let cookies = vec![cookie("theme", "dark"), cookie("session_token", &token)];

        let config = AuditConfig::default();
        let client = HttpClient::from_config(&config).expect("client");
        let ctx = ProbeContext {
            target: Target::parse("https://example.com").expect("target"),
            page: FetchedPage {
                final_url: "https://example.com/".to_string(),
                status: 200,
                headers: HashMap::new(),
                body: String::new(),
                cookies,
                redirect_chain: Vec::new(),
            },
            dns: Vec::new(),
            config,
            breaker: Arc::new(CircuitBreaker::default()),
        };

        let findings = SessionProbe.run(&client, &ctx).await.expect("probe");
        assert!(findings
            .iter()
            .any(|f| f.id == "session-posture-jwt-alg-none"));
    }
}
