//! Login discovery and credential rate-limit probing.
//!
//! Discovery runs in three phases: known login paths scanned for password
//! fields or auth-library markers, then a framework CSRF-issuance endpoint,
//! then OAuth/SSO redirect targets. Against a located endpoint the probe
//! issues a short burst of invalid credentials and classifies the outcome.
//! Frameworks that process logins server-side answer every attempt with a
//! redirect; that pattern is reported as not independently verifiable
//! rather than vulnerable.

use super::{Probe, ProbeContext};
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::{Severity, VulnerabilityFinding};
use async_trait::async_trait;
use tracing::{debug, info};

const LOGIN_PATHS: &[&str] = &[
    "login",
    "signin",
    "sign-in",
    "admin",
    "admin/login",
    "user/login",
    "account/login",
    "auth/login",
    "wp-login.php",
    "session/new",
];

/// Subdomain prefixes that commonly host a dedicated login origin
const LOGIN_SUBDOMAINS: &[&str] = &["auth", "login", "sso", "account", "id"];

/// Client-side markers of well-known authentication libraries
const AUTH_LIB_MARKERS: &[&str] = &[
    "next-auth",
    "auth0",
    "firebaseauth",
    "supabase.auth",
    "amazoncognito",
    "keycloak",
    "clerk.com",
];

/// External identity-provider hosts signalling SSO delegation
const SSO_HOSTS: &[&str] = &[
    "accounts.google.com",
    "login.microsoftonline.com",
    "github.com/login/oauth",
    "okta.com",
    "auth0.com",
    "login.salesforce.com",
];

/// Statuses treated as an explicit block or lockout response
const BLOCK_STATUSES: &[u16] = &[403, 423, 429];

enum LoginEndpoint {
    /// Plain form endpoint accepting a credential POST
    Form { url: String },
    /// Auth framework with server-side credential processing
    Framework { url: String, name: &'static str },
    /// Login delegated to an external identity provider
    Sso { provider: String },
}

pub struct BruteForceProbe;

#[async_trait]
impl Probe for BruteForceProbe {
    fn id(&self) -> &str {
        "login-rate-limit"
    }

    async fn run(
        &self,
        client: &HttpClient,
        ctx: &ProbeContext,
    ) -> Result<Vec<VulnerabilityFinding>> {
        let endpoint = match discover_login(client, ctx).await {
            Some(endpoint) => endpoint,
            None => {
                debug!("no login surface discovered");
                return Ok(Vec::new());
            }
        };

        let finding = match endpoint {
            LoginEndpoint::Sso { provider } => Some(VulnerabilityFinding::new(
                format!("{}-sso-delegated", self.id()),
                "Authentication Delegated to SSO Provider",
                Severity::Info,
                "Authentication",
                format!(
                    "Login is delegated to {provider}; lockout behavior is governed by \
                     the provider and not independently testable."
                ),
                &ctx.target.origin,
            )),
            LoginEndpoint::Form { url } => {
                let outcome = attempt_burst(client, &url, ctx.config.login_attempts).await;
                classify_form(self.id(), &url, outcome)
            }
            LoginEndpoint::Framework { url, name } => {
                let outcome = attempt_burst(client, &url, ctx.config.login_attempts).await;
                classify_framework(self.id(), &url, name, outcome)
            }
        };

        Ok(finding.into_iter().collect())
    }
}

async fn discover_login(client: &HttpClient, ctx: &ProbeContext) -> Option<LoginEndpoint> {
    // Phase one: known paths on the origin and likely login subdomains
    let mut origins = vec![ctx.target.origin.clone()];
    for prefix in LOGIN_SUBDOMAINS {
        origins.push(format!(
            "{}://{prefix}.{}",
            ctx.target.scheme, ctx.target.host
        ));
    }

    for origin in &origins {
        for path in LOGIN_PATHS {
            let url = format!("{origin}/{path}");
            let Ok(response) = client.get(&url).await else {
                continue;
            };
            if !response.status().is_success() {
                continue;
            }
            let body = response.text().await.unwrap_or_default();
            let lower = body.to_lowercase();
            if lower.contains("type=\"password\"") || lower.contains("type='password'") {
                info!("login form found at {url}");
                return Some(LoginEndpoint::Form { url });
            }
            if AUTH_LIB_MARKERS.iter().any(|m| lower.contains(m)) {
                info!("auth-library markers found at {url}");
                return Some(LoginEndpoint::Form { url });
            }
        }
    }

    // Phase two: framework CSRF-token issuance endpoint
    let csrf_url = ctx.target.url_for("/api/auth/csrf");
    if let Ok(response) = client.get(&csrf_url).await {
        if response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            if body.contains("csrfToken") {
                info!("auth framework csrf endpoint live at {csrf_url}");
                return Some(LoginEndpoint::Framework {
                    url: ctx.target.url_for("/api/auth/callback/credentials"),
                    name: "next-auth",
                });
            }
        }
    }

    // Phase three: OAuth/SSO redirect targets on the captured page
    for host in SSO_HOSTS {
        if ctx.page.body.contains(host) {
            info!("sso redirect target detected: {host}");
            return Some(LoginEndpoint::Sso {
                provider: host.to_string(),
            });
        }
    }

    None
}

struct BurstOutcome {
    statuses: Vec<u16>,
}

impl BurstOutcome {
    fn blocked(&self) -> bool {
        self.statuses.iter().any(|s| BLOCK_STATUSES.contains(s))
    }

    fn all_redirects(&self) -> bool {
        !self.statuses.is_empty() && self.statuses.iter().all(|s| (300..400).contains(s))
    }

    /// No attempt produced a status: every request failed at the transport
    /// level, so nothing can be said about throttling
    fn inconclusive(&self) -> bool {
        self.statuses.is_empty()
    }
}

/// Issues a burst of invalid credential attempts, recording each status
async fn attempt_burst(client: &HttpClient, url: &str, attempts: usize) -> BurstOutcome {
    let mut statuses = Vec::with_capacity(attempts);
    for n in 0..attempts {
        let body = format!("username=audit-probe-{n}&password=invalid-{n}&email=audit-probe-{n}%40example.com");
        match client.post_form(url, &body).await {
            Ok(response) => {
                let status = response.status().as_u16();
                debug!("login attempt {} -> {status}", n + 1);
                statuses.push(status);
                if BLOCK_STATUSES.contains(&status) {
                    break;
                }
            }
            Err(e) => {
                debug!("login attempt {} failed: {e}", n + 1);
            }
        }
    }
    BurstOutcome { statuses }
}

fn classify_form(probe_id: &str, url: &str, outcome: BurstOutcome) -> Option<VulnerabilityFinding> {
    if outcome.inconclusive() {
        debug!("no login attempt got a response, throttling not assessable");
        return None;
    }
    if outcome.blocked() {
        return Some(rate_limit_ok(probe_id, url));
    }
    Some(no_rate_limit(probe_id, url))
}

fn classify_framework(
    probe_id: &str,
    url: &str,
    framework: &str,
    outcome: BurstOutcome,
) -> Option<VulnerabilityFinding> {
    if outcome.inconclusive() {
        debug!("no login attempt got a response, throttling not assessable");
        return None;
    }
    if outcome.blocked() {
        return Some(rate_limit_ok(probe_id, url));
    }
    if outcome.all_redirects() {
        return Some(VulnerabilityFinding::new(
            format!("{probe_id}-server-side"),
            "Login Lockout Not Independently Verifiable",
            Severity::Info,
            "Authentication",
            format!(
                "The {framework} endpoint answers every credential attempt with a \
                 redirect; lockout behavior is not observable externally."
            ),
            url,
        ));
    }
    Some(no_rate_limit(probe_id, url))
}

fn rate_limit_ok(probe_id: &str, url: &str) -> VulnerabilityFinding {
    VulnerabilityFinding::new(
        format!("{probe_id}-ok"),
        "Login Rate Limiting Active",
        Severity::Info,
        "Authentication",
        "Repeated invalid credential attempts were explicitly blocked.".to_string(),
        url,
    )
}

fn no_rate_limit(probe_id: &str, url: &str) -> VulnerabilityFinding {
    VulnerabilityFinding::new(
        format!("{probe_id}-missing"),
        "No Login Rate Limiting Detected",
        Severity::High,
        "Authentication",
        "Rapid repeated invalid credential attempts were accepted without any \
         block or lockout response."
            .to_string(),
        url,
    )
    .with_remediation(
        "Throttle repeated failed logins per account and source address, and add \
         a lockout or challenge after a small number of failures.",
    )
    .with_cwe("CWE-307")
    .with_cvss(7.5)
}
