//! Configuration management for the Vigil audit engine

use crate::error::{Result, VigilError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Per-severity score penalties and posture bonuses.
///
/// These constants are preserved product decisions; changing them changes
/// every historical score comparison, so they are configuration, not code.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringWeights {
    pub critical_penalty: u32,
    pub high_penalty: u32,
    pub medium_penalty: u32,
    pub low_penalty: u32,
    /// Penalty per missing recommended security header
    pub header_penalty: u32,
    /// Cap on the total header penalty
    pub header_penalty_cap: u32,
    /// Bonus for TLS grade A+ or A
    pub tls_bonus: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            critical_penalty: 15,
            high_penalty: 10,
            medium_penalty: 5,
            low_penalty: 2,
            header_penalty: 2,
            header_penalty_cap: 10,
            tls_bonus: 3,
        }
    }
}

/// Configuration for one audit engine instance
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// User-Agent sent with every request
    pub user_agent: String,
    /// Timeout for individual HTTP probes, seconds
    pub http_timeout_secs: u64,
    /// TCP connect timeout for the port scanner, seconds
    pub connect_timeout_secs: u64,
    /// Window to wait for a service banner after connect, milliseconds
    pub banner_wait_ms: u64,
    /// Maximum redirect hops followed by the fetch tracker
    pub max_redirects: usize,
    /// Concurrent TCP probes during port scanning
    pub port_batch_size: usize,
    /// Concurrent requests during path-probing suites
    pub path_batch_size: usize,
    /// Rapid credential attempts issued by the brute-force probe
    pub login_attempts: usize,
    /// TTL for cached audit results, seconds
    pub cache_ttl_secs: u64,
    /// Maximum cached audit results
    pub cache_capacity: u64,
    pub scoring: ScoringWeights,
    /// Completion endpoint for leak-summary prose, disabled when None
    pub enrich_endpoint: Option<String>,
    pub enrich_model: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("Mozilla/5.0 (X11; Linux x86_64) ",
                "AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36")
            .to_string(),
            http_timeout_secs: 10,
            connect_timeout_secs: 3,
            banner_wait_ms: 500,
            max_redirects: 5,
            port_batch_size: 7,
            path_batch_size: 5,
            login_attempts: 4,
            cache_ttl_secs: 300,
            cache_capacity: 128,
            scoring: ScoringWeights::default(),
            enrich_endpoint: None,
            enrich_model: None,
        }
    }
}

impl AuditConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn banner_wait(&self) -> Duration {
        Duration::from_millis(self.banner_wait_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// File-based configuration sections, all optional
#[derive(Debug, Deserialize)]
struct FileConfig {
    audit: Option<AuditSection>,
    scoring: Option<ScoringWeights>,
    enrich: Option<EnrichSection>,
}

#[derive(Debug, Deserialize)]
struct AuditSection {
    user_agent: Option<String>,
    http_timeout_secs: Option<u64>,
    connect_timeout_secs: Option<u64>,
    max_redirects: Option<usize>,
    port_batch_size: Option<usize>,
    path_batch_size: Option<usize>,
    cache_ttl_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct EnrichSection {
    endpoint: Option<String>,
    model: Option<String>,
}

/// Loads configuration from a TOML file and merges it over the defaults
pub fn load_config(path: &Path) -> Result<AuditConfig> {
    let content = std::fs::read_to_string(path).map_err(VigilError::IoError)?;
    let file_config: FileConfig = toml::from_str(&content)?;

    let mut config = AuditConfig::default();

    if let Some(audit) = file_config.audit {
        if let Some(ua) = audit.user_agent {
            config.user_agent = ua;
        }
        if let Some(timeout) = audit.http_timeout_secs {
            config.http_timeout_secs = timeout;
        }
        if let Some(timeout) = audit.connect_timeout_secs {
            config.connect_timeout_secs = timeout;
        }
        if let Some(max) = audit.max_redirects {
            config.max_redirects = max;
        }
        if let Some(batch) = audit.port_batch_size {
            config.port_batch_size = batch.max(1);
        }
        if let Some(batch) = audit.path_batch_size {
            config.path_batch_size = batch.max(1);
        }
        if let Some(ttl) = audit.cache_ttl_secs {
            config.cache_ttl_secs = ttl;
        }
    }

    if let Some(scoring) = file_config.scoring {
        config.scoring = scoring;
    }

    if let Some(enrich) = file_config.enrich {
        config.enrich_endpoint = enrich.endpoint;
        config.enrich_model = enrich.model;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_match_product_constants() {
        let weights = ScoringWeights::default();
        assert_eq!(weights.critical_penalty, 15);
        assert_eq!(weights.high_penalty, 10);
        assert_eq!(weights.medium_penalty, 5);
        assert_eq!(weights.low_penalty, 2);
    }

    #[test]
    fn default_batches_are_bounded() {
        let config = AuditConfig::default();
        assert_eq!(config.port_batch_size, 7);
        assert_eq!(config.path_batch_size, 5);
        assert_eq!(config.max_redirects, 5);
    }
}
