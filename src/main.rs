//! Vigil - Website Security Audit CLI

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use vigil::audit::AuditEngine;
use vigil::config::{self, AuditConfig};
use vigil::models::{AuditResult, Severity};

/// Vigil - Website Security Audit Engine
#[derive(Parser)]
#[command(name = "vigil", version, about, long_about = None)]
struct Cli {
    /// Target hostname or URL to audit
    target: String,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit the full report as JSON instead of a terminal summary
    #[arg(long)]
    json: bool,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "vigil=debug" } else { "vigil=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => AuditConfig::default(),
    };
    if let Some(timeout) = cli.timeout {
        config.http_timeout_secs = timeout;
    }

    let engine = AuditEngine::new(config)?;
    let result = engine.run(&cli.target).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }

    Ok(())
}

fn print_summary(result: &AuditResult) {
    println!();
    println!("{}", format!("  Audit report for {}", result.origin).bold());

    if !result.reachable {
        let reason = result.error.as_deref().unwrap_or("unknown");
        println!("  {} {}", "target unreachable:".red().bold(), reason);
        return;
    }

    let score_colored = match result.score {
        80..=100 => result.score.to_string().green(),
        50..=79 => result.score.to_string().yellow(),
        _ => result.score.to_string().red(),
    };
    println!("  score: {} / 100", score_colored.bold());

    if let Some(tls) = &result.tls {
        println!(
            "  tls: {} / {} (grade {}, {} days to expiry)",
            tls.protocol, tls.cipher, tls.grade, tls.days_until_expiry
        );
    }
    if !result.ports.is_empty() {
        let ports: Vec<String> = result
            .ports
            .iter()
            .map(|p| format!("{} ({})", p.port, p.service))
            .collect();
        println!("  open ports: {}", ports.join(", "));
    }

    println!();
    for severity in [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ] {
        let count = result.count_by_severity(&severity);
        if count == 0 {
            continue;
        }
        let label = severity.to_string();
        let label = match severity {
            Severity::Critical => label.red().bold(),
            Severity::High => label.red(),
            Severity::Medium => label.yellow(),
            Severity::Low => label.cyan(),
            Severity::Info => label.normal(),
        };
        println!("  {label}: {count}");
    }

    for finding in &result.findings {
        println!("    [{}] {} - {}", finding.severity, finding.title, finding.affected);
    }

    if !result.leaks.is_empty() {
        println!();
        println!("  {}", "exposed files:".bold());
        for leak in &result.leaks {
            println!("    [{}] {}", leak.severity, leak.url);
        }
    }

    println!();
    for check in &result.compliance {
        let mark = if check.passed {
            "pass".green()
        } else {
            "fail".red()
        };
        println!("  [{mark}] {}: {}", check.name, check.detail);
    }
    println!();
    println!("  completed in {}ms", result.elapsed_ms);
}
