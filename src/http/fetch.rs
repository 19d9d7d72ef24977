//! Manual redirect-chain following and response capture

use crate::config::AuditConfig;
use crate::error::{Result, VigilError};
use crate::http::HttpClient;
use crate::models::CookieCheck;
use crate::target::Target;
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

/// Everything the probe suite needs from the initial page load
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub final_url: String,
    pub status: u16,
    /// Lower-cased header names to first observed value
    pub headers: HashMap<String, String>,
    pub body: String,
    pub cookies: Vec<CookieCheck>,
    pub redirect_chain: Vec<String>,
}

impl FetchedPage {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|v| v.as_str())
    }
}

/// Follows redirects manually (bounded hops), then issues one final request
/// to capture an accurate body and header set. Failure here is the only
/// condition that short-circuits the whole engine.
pub async fn fetch_page(
    client: &HttpClient,
    target: &Target,
    config: &AuditConfig,
) -> Result<FetchedPage> {
    let mut current = target.origin.clone();
    let mut chain = Vec::new();

    for hop in 0..config.max_redirects {
        let response = client
            .get(&current)
            .await
            .map_err(|e| VigilError::Unreachable(format!("{current}: {e}")))?;
        let status = response.status().as_u16();

        if !(300..400).contains(&status) {
            break;
        }
        let location = match response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
        {
            Some(l) => l.to_string(),
            None => break,
        };

        let next = resolve_location(&current, &location);
        debug!("redirect hop {}: {} -> {}", hop + 1, current, next);
        chain.push(next.clone());
        current = next;
    }

    // Final request against the resolved URL
    let response = client
        .get(&current)
        .await
        .map_err(|e| VigilError::Unreachable(format!("{current}: {e}")))?;

    let status = response.status().as_u16();
    let mut headers = HashMap::new();
    let mut cookies = Vec::new();

    for (name, value) in response.headers() {
        let key = name.as_str().to_lowercase();
        if let Ok(v) = value.to_str() {
            if key == "set-cookie" {
                cookies.push(parse_set_cookie(v));
            }
            headers.entry(key).or_insert_with(|| v.to_string());
        }
    }

    let body = response.text().await.unwrap_or_else(|e| {
        warn!("failed to read body from {current}: {e}");
        String::new()
    });

    Ok(FetchedPage {
        final_url: current,
        status,
        headers,
        body,
        cookies,
        redirect_chain: chain,
    })
}

/// Resolves a Location header value against the current URL
fn resolve_location(current: &str, location: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
        return location.to_string();
    }
    match Url::parse(current).and_then(|base| base.join(location)) {
        Ok(joined) => joined.to_string().trim_end_matches('/').to_string(),
        Err(_) => location.to_string(),
    }
}

/// Parses a Set-Cookie header into a CookieCheck with posture issues
pub fn parse_set_cookie(raw: &str) -> CookieCheck {
    let mut parts = raw.split(';');
    let name_value = parts.next().unwrap_or("");
    let (name, value) = match name_value.split_once('=') {
        Some((n, v)) => (n.trim().to_string(), v.trim().to_string()),
        None => (name_value.trim().to_string(), String::new()),
    };

    let mut secure = false;
    let mut http_only = false;
    let mut same_site = None;
    let mut path = None;
    let mut domain = None;

    for attr in parts {
        let attr = attr.trim();
        let lower = attr.to_lowercase();
        if lower == "secure" {
            secure = true;
        } else if lower == "httponly" {
            http_only = true;
        } else if let Some(v) = lower.strip_prefix("samesite=") {
            same_site = Some(v.to_string());
        } else if let Some(v) = attr
            .strip_prefix("Path=")
            .or_else(|| attr.strip_prefix("path="))
        {
            path = Some(v.to_string());
        } else if let Some(v) = attr
            .strip_prefix("Domain=")
            .or_else(|| attr.strip_prefix("domain="))
        {
            domain = Some(v.to_string());
        }
    }

    let mut issues = Vec::new();
    if !secure {
        issues.push("missing Secure flag".to_string());
    }
    if !http_only {
        issues.push("missing HttpOnly flag".to_string());
    }
    if same_site.is_none() {
        issues.push("missing SameSite attribute".to_string());
    } else if same_site.as_deref() == Some("none") && !secure {
        issues.push("SameSite=None without Secure".to_string());
    }

    CookieCheck {
        name,
        value,
        secure,
        http_only,
        same_site,
        path,
        domain,
        issues,
    }
}
