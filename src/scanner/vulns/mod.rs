//! Vulnerability probe suite.
//!
//! Each probe is independent, consumes a subset of the captured page, the
//! origin, and the DNS results, and returns zero or more findings. Probes
//! run concurrently in a JoinSet; a failing probe contributes nothing and
//! never aborts its siblings.

pub mod admin_paths;
pub mod brute_force;
pub mod csrf;
pub mod disclosure;
pub mod downgrade;
pub mod email_auth;
pub mod injection;
pub mod reflected;
pub mod session;
pub mod subdomains;

use crate::cache::CircuitBreaker;
use crate::config::AuditConfig;
use crate::error::Result;
use crate::http::{FetchedPage, HttpClient};
use crate::models::{DnsRecord, VulnerabilityFinding};
use crate::target::Target;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Captured artifacts shared read-only by every probe
pub struct ProbeContext {
    pub target: Target,
    pub page: FetchedPage,
    pub dns: Vec<DnsRecord>,
    pub config: AuditConfig,
    pub breaker: Arc<CircuitBreaker>,
}

/// Trait implemented by all vulnerability probes
#[async_trait]
pub trait Probe: Send + Sync {
    /// Stable probe identifier, used as the finding-id prefix
    fn id(&self) -> &str;

    /// Executes the probe and returns findings
    async fn run(&self, client: &HttpClient, ctx: &ProbeContext)
        -> Result<Vec<VulnerabilityFinding>>;
}

/// Runs all registered probes and collects their findings
pub struct ProbeSuite {
    probes: Vec<Arc<dyn Probe>>,
}

impl ProbeSuite {
    pub fn new() -> Self {
        Self { probes: Vec::new() }
    }

    /// Suite with every default probe registered
    pub fn with_defaults() -> Self {
        let mut suite = Self::new();
        suite.register(Arc::new(reflected::ReflectedProbe));
        suite.register(Arc::new(csrf::CsrfProbe));
        suite.register(Arc::new(disclosure::DisclosureProbe));
        suite.register(Arc::new(admin_paths::AdminPathProbe));
        suite.register(Arc::new(brute_force::BruteForceProbe));
        suite.register(Arc::new(injection::InjectionProbe));
        suite.register(Arc::new(subdomains::SubdomainProbe));
        suite.register(Arc::new(downgrade::DowngradeProbe));
        suite.register(Arc::new(session::SessionProbe));
        suite.register(Arc::new(email_auth::EmailAuthProbe));
        suite
    }

    pub fn register(&mut self, probe: Arc<dyn Probe>) {
        self.probes.push(probe);
    }

    /// Fans out all probes concurrently. Probe errors and panics are logged
    /// and dropped; the suite always returns whatever the survivors found.
    pub async fn run_all(
        &self,
        client: &HttpClient,
        ctx: Arc<ProbeContext>,
    ) -> Vec<VulnerabilityFinding> {
        let mut set = JoinSet::new();

        for probe in &self.probes {
            let probe = Arc::clone(probe);
            let client = client.clone();
            let ctx = Arc::clone(&ctx);
            let id = probe.id().to_string();

            set.spawn(async move {
                info!("running probe: {id}");
                let outcome = probe.run(&client, &ctx).await;
                (id, outcome)
            });
        }

        let mut findings = Vec::new();
        while let Some(join_result) = set.join_next().await {
            match join_result {
                Ok((id, Ok(probe_findings))) => {
                    info!("probe '{id}' completed: {} findings", probe_findings.len());
                    findings.extend(probe_findings);
                }
                Ok((id, Err(e))) => {
                    error!("probe '{id}' failed: {e}");
                }
                Err(e) => {
                    error!("probe task panicked: {e}");
                }
            }
        }
        findings
    }
}

impl Default for ProbeSuite {
    fn default() -> Self {
        Self::with_defaults()
    }
}
