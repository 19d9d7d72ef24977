//! Soft-404 baseline handling shared by the path-probing components.
//!
//! Origins frequently answer nonexistent paths with a styled 200 page.
//! A baseline captured from one random path lets probes tell a real file
//! apart from that custom error page.

use crate::http::HttpClient;
use tracing::debug;
use uuid::Uuid;

/// Body phrases that mark a custom error page regardless of status
const NOT_FOUND_PHRASES: &[&str] = &[
    "page not found",
    "not found",
    "error 404",
    "does not exist",
    "nothing here",
    "page doesn't exist",
    "we couldn't find",
    "the page you",
    "resource not found",
];

/// Baseline response captured from a known-nonexistent path
#[derive(Debug, Clone, Default)]
pub struct Soft404Baseline {
    body: Option<String>,
}

impl Soft404Baseline {
    /// Probes one random nonexistent path under the origin. A non-success
    /// status means the origin 404s honestly and no baseline is needed.
    pub async fn establish(client: &HttpClient, origin: &str) -> Self {
        let nonexistent = format!("{origin}/{}", Uuid::new_v4().simple());

        let body = match client.get(&nonexistent).await {
            Ok(response) if response.status().is_success() => {
                debug!("origin serves 200 for nonexistent paths, capturing baseline");
                Some(response.text().await.unwrap_or_default())
            }
            _ => None,
        };
        Self { body }
    }

    /// Whether a candidate body looks like the origin's error page
    pub fn matches(&self, body: &str) -> bool {
        let lower = body.to_lowercase();
        if NOT_FOUND_PHRASES.iter().any(|p| lower.contains(p)) {
            return true;
        }
        match &self.body {
            Some(baseline) => body_similarity(body, baseline) > 0.85,
            None => false,
        }
    }
}

/// Whether a body is an HTML document. Real config files, dumps, and
/// metadata are never full HTML pages.
pub fn is_html_document(body: &str) -> bool {
    let head = body.trim_start().to_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

/// Cheap similarity ratio in [0, 1]: length ratio gate, then a positional
/// character comparison over a bounded prefix
pub fn body_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let len_ratio = a.len().min(b.len()) as f64 / a.len().max(b.len()) as f64;
    if len_ratio < 0.8 {
        return len_ratio;
    }

    let sample_a: Vec<char> = a.chars().take(2000).collect();
    let sample_b: Vec<char> = b.chars().take(2000).collect();
    let shorter = sample_a.len().min(sample_b.len());
    if shorter == 0 {
        return len_ratio;
    }

    let matching = sample_a
        .iter()
        .zip(sample_b.iter())
        .filter(|(x, y)| x == y)
        .count();
    matching as f64 / shorter as f64
}
