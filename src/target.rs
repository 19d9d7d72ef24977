//! Target normalization: raw caller input to scheme, host, and origin

use crate::error::{Result, VigilError};
use url::Url;

/// Parsed audit target used by every downstream component
#[derive(Debug, Clone)]
pub struct Target {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    /// scheme://host[:port], no trailing slash
    pub origin: String,
}

impl Target {
    /// Parses a bare hostname or full URL. A missing scheme defaults to
    /// https. The only structural input error is an empty target string.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(VigilError::EmptyTarget);
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };

        let url = Url::parse(&with_scheme)?;
        let host = url
            .host_str()
            .ok_or_else(|| VigilError::ConfigError(format!("no host in target '{raw}'")))?
            .to_string();
        let scheme = url.scheme().to_string();
        let port = url.port();

        let origin = match port {
            Some(p) => format!("{scheme}://{host}:{p}"),
            None => format!("{scheme}://{host}"),
        };

        Ok(Self {
            scheme,
            host,
            port,
            origin,
        })
    }

    /// Effective port, falling back to the scheme default
    pub fn effective_port(&self) -> u16 {
        self.port
            .unwrap_or(if self.scheme == "http" { 80 } else { 443 })
    }

    /// Builds a URL for a path under this origin
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.origin, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_secure_scheme() {
        let target = Target::parse("example.com").expect("parse");
        assert_eq!(target.scheme, "https");
        assert_eq!(target.host, "example.com");
        assert_eq!(target.origin, "https://example.com");
        assert_eq!(target.effective_port(), 443);
    }

    #[test]
    fn full_url_is_preserved() {
        let target = Target::parse("http://example.com:8080/some/path?q=1").expect("parse");
        assert_eq!(target.scheme, "http");
        assert_eq!(target.origin, "http://example.com:8080");
        assert_eq!(target.effective_port(), 8080);
    }

    #[test]
    fn empty_target_is_a_structural_error() {
        assert!(matches!(Target::parse("   "), Err(VigilError::EmptyTarget)));
    }

    #[test]
    fn url_for_joins_without_double_slash() {
        let target = Target::parse("example.com").expect("parse");
        assert_eq!(target.url_for("/.env"), "https://example.com/.env");
        assert_eq!(target.url_for("admin"), "https://example.com/admin");
    }
}
