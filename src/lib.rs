//! Vigil - Website Security Audit Engine
//!
//! Runs a bounded-time concurrent battery of network and application probes
//! against a single target and assembles a structured report with a
//! deterministic 0-100 risk score.

pub mod audit;
pub mod cache;
pub mod config;
pub mod enrich;
pub mod error;
pub mod http;
pub mod models;
pub mod scanner;
pub mod score;
pub mod target;
