//! # Liveness probing
//!
//! Two independent ways of asking "is anyone there?":
//!
//! * a TCP connect to a single port, where a refused connection still proves
//!   the host is up, and
//! * one ICMP echo through the system `ping` binary, so no raw-socket
//!   privileges are needed.
//!
//! Neither strategy ever returns an error: every failure mode folds into a
//! dead [`ProbeResult`].

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lanwatch_common::network::address;
use lanwatch_common::scan::ProbeResult;
use lanwatch_protocols::ping::{self, PingFlavor};
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::timeout;

pub const DEFAULT_PROBE_PORT: u16 = 80;

/// Grace period on top of the `ping` utility's own wait.
const PING_GRACE: Duration = Duration::from_millis(500);

/// Liveness strategies the orchestrator sweeps with.
#[async_trait]
pub trait HostProber: Send + Sync {
    async fn probe_tcp(&self, ip: Ipv4Addr, port: u16, timeout: Duration) -> ProbeResult;

    async fn probe_icmp(&self, ip: Ipv4Addr, timeout: Duration) -> ProbeResult;
}

/// Probes the real network.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProber;

#[async_trait]
impl HostProber for SystemProber {
    async fn probe_tcp(&self, ip: Ipv4Addr, port: u16, timeout: Duration) -> ProbeResult {
        probe_tcp(ip, port, timeout).await
    }

    async fn probe_icmp(&self, ip: Ipv4Addr, timeout: Duration) -> ProbeResult {
        probe_icmp(ip, timeout).await
    }
}

/// How a TCP connect attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    /// The far end answered with a reset.
    Refused,
    TimedOut,
    Unreachable,
    Failed,
}

impl ConnectOutcome {
    pub fn host_alive(self) -> bool {
        matches!(self, ConnectOutcome::Connected | ConnectOutcome::Refused)
    }
}

pub fn classify_connect_error(err: &io::Error) -> ConnectOutcome {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => ConnectOutcome::Refused,
        io::ErrorKind::TimedOut => ConnectOutcome::TimedOut,
        io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
            ConnectOutcome::Unreachable
        }
        _ => ConnectOutcome::Failed,
    }
}

/// Attempts one TCP connection and reports how it ended.
pub async fn connect(ip: Ipv4Addr, port: u16, probe_timeout: Duration) -> ConnectOutcome {
    connect_within(probe_timeout, TcpStream::connect(SocketAddr::from((ip, port)))).await
}

async fn connect_within<F, T>(probe_timeout: Duration, attempt: F) -> ConnectOutcome
where
    F: Future<Output = io::Result<T>>,
{
    match timeout(probe_timeout, attempt).await {
        Ok(Ok(_stream)) => ConnectOutcome::Connected,
        Ok(Err(err)) => classify_connect_error(&err),
        Err(_elapsed) => ConnectOutcome::TimedOut,
    }
}

pub async fn probe_tcp(ip: Ipv4Addr, port: u16, probe_timeout: Duration) -> ProbeResult {
    let result = probe_connect(probe_timeout, TcpStream::connect(SocketAddr::from((ip, port)))).await;
    if !result.alive {
        tracing::trace!("{ip}:{port} did not answer");
    }
    result
}

async fn probe_connect<F, T>(probe_timeout: Duration, attempt: F) -> ProbeResult
where
    F: Future<Output = io::Result<T>>,
{
    let started = Instant::now();
    let outcome = connect_within(probe_timeout, attempt).await;

    if outcome.host_alive() {
        ProbeResult::alive(started.elapsed().as_secs_f64() * 1000.0)
    } else {
        tracing::trace!("connect ended {outcome:?}");
        ProbeResult::dead()
    }
}

/// [`probe_tcp`] for an address that has not been parsed yet. Malformed
/// input is dead without touching the network.
pub async fn probe_tcp_str(ip: &str, port: u16, probe_timeout: Duration) -> ProbeResult {
    match address::parse(ip) {
        Some(ip) => probe_tcp(ip, port, probe_timeout).await,
        None => ProbeResult::dead(),
    }
}

pub async fn probe_icmp(ip: Ipv4Addr, probe_timeout: Duration) -> ProbeResult {
    let args = PingFlavor::current().args(ip, probe_timeout);

    let mut command = Command::new("ping");
    command
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let output = match timeout(probe_timeout + PING_GRACE, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => {
            tracing::warn!("could not run ping: {err}");
            return ProbeResult::dead();
        }
        Err(_elapsed) => return ProbeResult::dead(),
    };

    if !output.status.success() {
        return ProbeResult::dead();
    }

    match ping::parse_rtt(&String::from_utf8_lossy(&output.stdout)) {
        Some(rtt) => ProbeResult::alive(rtt),
        None => ProbeResult::dead(),
    }
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
    use tokio::net::TcpListener;

    #[test]
    fn refused_counts_as_alive() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(classify_connect_error(&refused), ConnectOutcome::Refused);
        assert!(ConnectOutcome::Refused.host_alive());

        let unreachable = io::Error::from(io::ErrorKind::HostUnreachable);
        assert_eq!(classify_connect_error(&unreachable), ConnectOutcome::Unreachable);
        assert!(!ConnectOutcome::Unreachable.host_alive());
        assert!(!ConnectOutcome::TimedOut.host_alive());
    }

    #[tokio::test]
    async fn open_port_is_alive() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let result = probe_tcp(Ipv4Addr::LOCALHOST, port, Duration::from_secs(1)).await;
        assert!(result.alive);
        assert!(result.rtt_millis.unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn closed_port_on_live_host_is_alive() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = probe_tcp(Ipv4Addr::LOCALHOST, port, Duration::from_secs(1)).await;
        assert!(result.alive);
        assert!(result.rtt_millis.unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn invalid_address_string_is_dead() {
        let result = probe_tcp_str("192.168.1.300", 80, Duration::from_secs(5)).await;
        assert_eq!(result, ProbeResult::dead());
        let result = probe_tcp_str("localhost", 80, Duration::from_secs(5)).await;
        assert!(!result.alive);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_peer_is_dead_at_the_timeout() {
        let probe_timeout = Duration::from_millis(300);
        let started = tokio::time::Instant::now();
        let result = probe_connect(probe_timeout, std::future::pending::<io::Result<()>>()).await;

        assert!(!result.alive);
        assert_eq!(result.rtt_millis, None);
        let waited = started.elapsed();
        assert!(waited >= probe_timeout);
        assert!(waited < probe_timeout + Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_peer_times_out() {
        let outcome = connect_within(
            Duration::from_millis(100),
            std::future::pending::<io::Result<()>>(),
        )
        .await;
        assert_eq!(outcome, ConnectOutcome::TimedOut);
    }

    #[tokio::test]
    #[ignore]
    async fn unused_address_is_dead_within_timeout() {
        let started = Instant::now();
        let result = probe_tcp(Ipv4Addr::new(192, 168, 255, 254), 80, Duration::from_millis(300)).await;
        assert!(!result.alive);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    #[ignore]
    async fn icmp_reaches_loopback() {
        let result = probe_icmp(Ipv4Addr::LOCALHOST, Duration::from_secs(1)).await;
        assert!(result.alive);
    }
}
