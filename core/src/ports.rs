//! # Port scanning
//!
//! Connect scan of a short, curated port list against a host that is already
//! known to be alive.

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use lanwatch_common::config::Config;
use lanwatch_common::device::{Port, Service};
use lanwatch_common::error::ScanError;
use tokio_util::sync::CancellationToken;

use crate::liveness::{self, ConnectOutcome};

#[async_trait]
pub trait PortProber: Send + Sync {
    /// Open ports of `ip`, ascending. Fails only with [`ScanError::Cancelled`].
    async fn scan(&self, ip: Ipv4Addr, cancel: &CancellationToken) -> Result<Vec<Port>, ScanError>;
}

pub struct TcpPortScanner {
    ports: Vec<u16>,
    workers: usize,
    timeout: Duration,
}

impl TcpPortScanner {
    pub fn new(ports: Vec<u16>, workers: usize, timeout: Duration) -> Self {
        Self {
            ports,
            workers: workers.max(1),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.scan_ports.clone(), config.port_workers, config.port_timeout)
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }
}

#[async_trait]
impl PortProber for TcpPortScanner {
    async fn scan(&self, ip: Ipv4Addr, cancel: &CancellationToken) -> Result<Vec<Port>, ScanError> {
        let probe_timeout = self.timeout;

        let mut open: Vec<Port> = stream::iter(self.ports.iter().copied())
            .map(|port| async move {
                if cancel.is_cancelled() {
                    return None;
                }
                match liveness::connect(ip, port, probe_timeout).await {
                    ConnectOutcome::Connected => Some(Port::open(port)),
                    _ => None,
                }
            })
            .buffer_unordered(self.workers)
            .filter_map(|port| async move { port })
            .collect()
            .await;

        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        open.sort();
        open.dedup();
        Ok(open)
    }
}

/// Catalog services behind a set of open ports.
pub fn services_for(ports: &[Port]) -> Vec<Service> {
    ports
        .iter()
        .filter_map(|port| Service::from_port(port.number))
        .collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use lanwatch_common::services::ServiceKind;
    use tokio::net::TcpListener;

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn finds_only_listening_ports() {
        let first = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let second = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open_a = first.local_addr().unwrap().port();
        let open_b = second.local_addr().unwrap().port();
        let closed = closed_port().await;

        let scanner = TcpPortScanner::new(vec![open_b, closed, open_a], 2, Duration::from_secs(1));
        let ports = scanner.scan(Ipv4Addr::LOCALHOST, &CancellationToken::new()).await.unwrap();

        let mut expected = vec![open_a, open_b];
        expected.sort();
        let numbers: Vec<u16> = ports.iter().map(|p| p.number).collect();
        assert_eq!(numbers, expected);
    }

    #[tokio::test]
    async fn cancelled_scan_reports_cancellation() {
        let scanner = TcpPortScanner::new(vec![closed_port().await], 1, Duration::from_secs(1));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = scanner.scan(Ipv4Addr::LOCALHOST, &cancel).await;
        assert!(matches!(result, Err(ScanError::Cancelled)));
    }

    #[test]
    fn open_ports_map_to_services() {
        let ports = vec![Port::open(22), Port::open(80), Port::open(50000)];
        let services = services_for(&ports);
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].kind, ServiceKind::Ssh);
        assert_eq!(services[1].port, Some(80));
        assert_eq!(ports[0].service_name, "SSH");
    }

    #[test]
    fn zero_workers_still_scans() {
        let scanner = TcpPortScanner::from_config(&Config {
            port_workers: 0,
            ..Config::default()
        });
        assert_eq!(scanner.workers, 1);
        assert_eq!(scanner.ports(), &[21, 22, 23, 25, 53, 80, 110, 143, 443, 993, 995]);
    }
}
