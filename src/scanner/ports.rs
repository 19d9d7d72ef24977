//! Batched concurrent TCP port probing with banner capture

use crate::config::AuditConfig;
use crate::models::{PortResult, PortState, Severity};
use futures::stream::{self, StreamExt};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

/// Reference table of probed ports: (port, service, risk tier when exposed)
const PORT_TABLE: &[(u16, &str, Severity)] = &[
    (21, "ftp", Severity::High),
    (22, "ssh", Severity::Medium),
    (23, "telnet", Severity::Critical),
    (25, "smtp", Severity::Low),
    (53, "dns", Severity::Low),
    (80, "http", Severity::Info),
    (110, "pop3", Severity::Low),
    (143, "imap", Severity::Low),
    (443, "https", Severity::Info),
    (445, "smb", Severity::Critical),
    (1433, "mssql", Severity::Critical),
    (3306, "mysql", Severity::Critical),
    (3389, "rdp", Severity::High),
    (5432, "postgresql", Severity::Critical),
    (5900, "vnc", Severity::High),
    (6379, "redis", Severity::Critical),
    (8080, "http-alt", Severity::Medium),
    (8443, "https-alt", Severity::Medium),
    (9200, "elasticsearch", Severity::Critical),
    (27017, "mongodb", Severity::Critical),
];

/// Web ports never flagged as unexpected exposure
pub const WEB_PORTS: &[u16] = &[80, 443];

/// Reverse-proxy ports excluded from exposure flagging when the target
/// sits behind a proxy or CDN
pub const PROXY_PORTS: &[u16] = &[8080, 8443];

/// Probes the reference port table against a host in bounded batches.
/// Returns only open ports, sorted ascending; timeouts and connection
/// errors are benign not-open results, never faults.
pub async fn scan_ports(host: &str, config: &AuditConfig) -> Vec<PortResult> {
    info!("port scan: {} ports against {host}", PORT_TABLE.len());

    let mut open: Vec<PortResult> = stream::iter(PORT_TABLE.iter())
        .map(|(port, service, risk)| {
            let host = host.to_string();
            async move {
                let result = probe_port(&host, *port, service, risk.clone(), config).await;
                if result.state != PortState::Open {
                    return None;
                }
                Some(result)
            }
        })
        .buffer_unordered(config.port_batch_size)
        .filter_map(|r| async { r })
        .collect()
        .await;

    open.sort_by_key(|p| p.port);
    info!("port scan complete: {} open", open.len());
    open
}

async fn probe_port(
    host: &str,
    port: u16,
    service: &str,
    risk: Severity,
    config: &AuditConfig,
) -> PortResult {
    let addr = format!("{host}:{port}");

    let stream = match timeout(config.connect_timeout(), TcpStream::connect(&addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            debug!("port {port} closed: {e}");
            return not_open(port, service, risk, PortState::Closed);
        }
        Err(_) => {
            debug!("port {port} filtered (connect timeout)");
            return not_open(port, service, risk, PortState::Filtered);
        }
    };

    let banner = read_banner(stream, config).await;
    debug!("port {port} open, banner: {:?}", banner.as_deref());

    PortResult {
        port,
        service: service.to_string(),
        state: PortState::Open,
        banner,
        risk,
    }
}

/// Listens briefly for a service banner after connect, then closes
async fn read_banner(mut stream: TcpStream, config: &AuditConfig) -> Option<String> {
    let mut buf = [0u8; 256];
    match timeout(config.banner_wait(), stream.read(&mut buf)).await {
        Ok(Ok(n)) if n > 0 => {
            let banner: String = String::from_utf8_lossy(&buf[..n])
                .chars()
                .filter(|c| !c.is_control() || *c == ' ')
                .take(120)
                .collect();
            let banner = banner.trim().to_string();
            if banner.is_empty() {
                None
            } else {
                Some(banner)
            }
        }
        _ => None,
    }
}

fn not_open(port: u16, service: &str, risk: Severity, state: PortState) -> PortResult {
    PortResult {
        port,
        service: service.to_string(),
        state,
        banner: None,
        risk,
    }
}

/// Whether an open port should be flagged as unexpected exposure
pub fn is_unexpected(port: u16, behind_proxy: bool) -> bool {
    if WEB_PORTS.contains(&port) {
        return false;
    }
    if behind_proxy && PROXY_PORTS.contains(&port) {
        return false;
    }
    true
}
