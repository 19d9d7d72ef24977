//! Error types for the Vigil audit engine

use thiserror::Error;

/// Main error type for Vigil operations
#[derive(Debug, Error)]
pub enum VigilError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TLS error: {0}")]
    TlsError(String),

    #[error("DNS error: {0}")]
    DnsError(String),

    #[error("target is empty")]
    EmptyTarget,

    #[error("target unreachable: {0}")]
    Unreachable(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("internal fault: {0}")]
    Internal(String),
}

/// Result type alias for Vigil operations
pub type Result<T> = std::result::Result<T, VigilError>;
