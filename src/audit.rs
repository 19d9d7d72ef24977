//! Audit engine: orchestrates collection, probing, scoring, and assembly.
//!
//! Pipeline: normalize, cache lookup, fetch (the only run-aborting stage),
//! concurrent network collectors, concurrent probe/leak fan-out, compliance,
//! scoring, merge. The returned report owns everything.

use crate::cache::{AuditCache, CircuitBreaker};
use crate::config::AuditConfig;
use crate::enrich::{HttpLeakEnricher, LeakEnricher};
use crate::error::{Result, VigilError};
use crate::http::{fetch_page, HttpClient};
use crate::models::{AuditResult, Severity, VulnerabilityFinding};
use crate::scanner::dns::DnsResolver;
use crate::scanner::vulns::{ProbeContext, ProbeSuite};
use crate::scanner::{compliance, headers, leaks, ports, tls};
use crate::score::compute_score;
use crate::target::Target;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Response headers surfaced as technology hints in the report
const TECHNOLOGY_HEADERS: &[&str] = &["server", "x-powered-by", "x-aspnet-version", "x-generator"];

pub struct AuditEngine {
    config: AuditConfig,
    client: HttpClient,
    cache: AuditCache,
    breaker: Arc<CircuitBreaker>,
    resolver: DnsResolver,
    suite: ProbeSuite,
}

impl AuditEngine {
    pub fn new(config: AuditConfig) -> Result<Self> {
        let client = HttpClient::from_config(&config)?;
        let cache = AuditCache::new(config.cache_capacity, config.cache_ttl());
        let resolver = DnsResolver::new(config.connect_timeout());
        Ok(Self {
            config,
            client,
            cache,
            breaker: Arc::new(CircuitBreaker::default()),
            resolver,
            suite: ProbeSuite::with_defaults(),
        })
    }

    /// Runs one complete audit. The only caller-visible fault is an empty
    /// target string; an unreachable target and internal faults both come
    /// back as reports.
    pub async fn run(&self, raw_target: &str) -> Result<AuditResult> {
        match self.run_inner(raw_target).await {
            Ok(result) => Ok(result),
            Err(VigilError::EmptyTarget) => Err(VigilError::EmptyTarget),
            Err(e) => {
                error!("audit of '{raw_target}' failed internally: {e}");
                let mut result = AuditResult::empty(raw_target);
                result.error = Some(format!("internal error: {e}"));
                Ok(result)
            }
        }
    }

    async fn run_inner(&self, raw_target: &str) -> Result<AuditResult> {
        let target = Target::parse(raw_target)?;

        if let Some(cached) = self.cache.get(&target.origin).await {
            info!("cache hit for {}", target.origin);
            return Ok((*cached).clone());
        }

        let started = Instant::now();
        let mut result = AuditResult::new(raw_target, &target.origin);

        let page = match fetch_page(&self.client, &target, &self.config).await {
            Ok(page) => page,
            Err(VigilError::Unreachable(reason)) => {
                warn!("target unreachable: {reason}");
                let mut unreachable = AuditResult::unreachable(raw_target, reason);
                unreachable.elapsed_ms = started.elapsed().as_millis() as u64;
                return Ok(unreachable);
            }
            Err(e) => return Err(e),
        };
        info!(
            "fetched {} ({} redirect hops, status {})",
            page.final_url,
            page.redirect_chain.len(),
            page.status
        );

        result.status_code = Some(page.status);
        result.redirect_chain = page.redirect_chain.clone();
        result.server_header = page.header("server").map(str::to_string);
        result.technology_headers = TECHNOLOGY_HEADERS
            .iter()
            .filter_map(|name| page.header(name).map(|v| (name.to_string(), v.to_string())))
            .collect();
        result.cookies = page.cookies.clone();

        // Network collectors run concurrently; each degrades to empty/None
        let tls_port = target.effective_port();
        let (open_ports, tls_result, dns_records) = tokio::join!(
            ports::scan_ports(&target.host, &self.config),
            async {
                if target.scheme == "https" {
                    tls::inspect_tls(&target.host, tls_port, &self.config).await
                } else {
                    None
                }
            },
            self.resolver.resolve_records(&target.host),
        );

        let header_checks = headers::check_headers(&page);
        let behind_proxy = headers::behind_proxy(&page);

        let mut findings: Vec<VulnerabilityFinding> = Vec::new();
        findings.extend(headers::header_findings(&page, &target.origin));
        findings.extend(port_exposure_findings(&open_ports, behind_proxy, &target.host));
        if let Some(ref tls) = tls_result {
            findings.extend(tls::tls_findings(tls, &target.host));
        }

        let ctx = Arc::new(ProbeContext {
            target: target.clone(),
            page: page.clone(),
            dns: dns_records.clone(),
            config: self.config.clone(),
            breaker: Arc::clone(&self.breaker),
        });

        let (probe_findings, (leak_findings, leak_summary)) = tokio::join!(
            self.suite.run_all(&self.client, Arc::clone(&ctx)),
            leaks::detect_leaks(&self.client, &target, &self.config),
        );
        findings.extend(probe_findings);
        findings.extend(leak_summary);

        let enricher = HttpLeakEnricher::new(
            self.client.clone(),
            Arc::clone(&self.breaker),
            self.config.enrich_endpoint.clone(),
            self.config
                .enrich_model
                .clone()
                .unwrap_or_else(|| "llama3".to_string()),
        );
        let leak_findings = enricher.enrich(leak_findings).await;

        result.compliance =
            compliance::run_checks(&self.client, &target, &page, &header_checks).await;

        result.score = compute_score(
            &self.config.scoring,
            &findings,
            &leak_findings,
            &header_checks,
            tls_result.as_ref().map(|t| t.grade.as_str()),
        );

        // Final merge; nothing mutates the report after this point
        findings.sort_by(|a, b| a.severity.cmp(&b.severity));
        result.findings = findings;
        result.header_checks = header_checks;
        result.ports = open_ports;
        result.tls = tls_result;
        result.dns_records = dns_records;
        result.leaks = leak_findings;
        result.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            "audit of {} complete: score {}, {} findings, {} leaks, {} requests, {}ms",
            target.origin,
            result.score,
            result.findings.len(),
            result.leaks.len(),
            self.client.request_count(),
            result.elapsed_ms
        );

        self.cache.insert(target.origin.clone(), result.clone()).await;
        Ok(result)
    }
}

/// Findings for open ports outside the expected web surface
fn port_exposure_findings(
    open_ports: &[crate::models::PortResult],
    behind_proxy: bool,
    host: &str,
) -> Vec<VulnerabilityFinding> {
    open_ports
        .iter()
        .filter(|p| ports::is_unexpected(p.port, behind_proxy))
        .map(|p| {
            let mut finding = VulnerabilityFinding::new(
                format!("exposed-port-{}", p.port),
                format!("Unexpected Open Port {} ({})", p.port, p.service),
                p.risk.clone(),
                "Network Exposure",
                match &p.banner {
                    Some(banner) => format!(
                        "Port {} ({}) accepts connections. Banner: {banner}",
                        p.port, p.service
                    ),
                    None => format!("Port {} ({}) accepts connections.", p.port, p.service),
                },
                format!("{host}:{}", p.port),
            )
            .with_remediation("Close the port or restrict it to trusted networks.")
            .with_cwe("CWE-1327");
            if p.risk == Severity::Critical {
                finding = finding.with_cvss(9.0);
            }
            finding
        })
        .collect()
}
