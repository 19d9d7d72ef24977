//! Bounded TTL result cache and per-upstream circuit breaker.
//!
//! Both are owned by the engine and accessed only through this interface;
//! neither survives the engine instance.

use crate::models::AuditResult;
use moka::future::Cache;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// TTL-evicted cache of finished audit results, keyed by target + parameters
pub struct AuditCache {
    cache: Cache<String, Arc<AuditResult>>,
}

impl AuditCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        info!("audit cache initialized: capacity={capacity}, ttl={ttl:?}");
        Self { cache }
    }

    pub async fn get(&self, key: &str) -> Option<Arc<AuditResult>> {
        let hit = self.cache.get(key).await;
        if hit.is_some() {
            debug!("audit cache hit for {key}");
        }
        hit
    }

    pub async fn insert(&self, key: String, result: AuditResult) {
        self.cache.insert(key, Arc::new(result)).await;
    }

    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct CircuitStatus {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
}

impl CircuitStatus {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            opened_at: None,
        }
    }
}

/// Guards repeatedly-failing upstream services (CT log search, completion
/// endpoint) behind a cooldown window.
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    circuits: RwLock<HashMap<String, CircuitStatus>>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            cooldown,
            circuits: RwLock::new(HashMap::new()),
        }
    }

    /// Whether a request to this upstream is currently allowed. An open
    /// circuit transitions to half-open once the cooldown has elapsed,
    /// letting a single trial request through.
    pub async fn is_allowed(&self, upstream: &str) -> bool {
        let mut circuits = self.circuits.write().await;
        let status = circuits
            .entry(upstream.to_string())
            .or_insert_with(CircuitStatus::new);

        match status.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = status.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.cooldown {
                    debug!("circuit for {upstream} half-open after cooldown");
                    status.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub async fn record_success(&self, upstream: &str) {
        let mut circuits = self.circuits.write().await;
        let status = circuits
            .entry(upstream.to_string())
            .or_insert_with(CircuitStatus::new);
        status.state = CircuitState::Closed;
        status.failure_count = 0;
        status.opened_at = None;
    }

    pub async fn record_failure(&self, upstream: &str) {
        let mut circuits = self.circuits.write().await;
        let status = circuits
            .entry(upstream.to_string())
            .or_insert_with(CircuitStatus::new);
        status.failure_count += 1;

        let tripped = status.state == CircuitState::HalfOpen
            || status.failure_count >= self.failure_threshold;
        if tripped {
            debug!(
                "circuit for {upstream} open after {} failures",
                status.failure_count
            );
            status.state = CircuitState::Open;
            status.opened_at = Some(Instant::now());
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(60))
    }
}
