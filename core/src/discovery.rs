//! # Discovery probes
//!
//! Every mechanism that can learn about hosts without sweeping the address
//! range: the neighbor table, mDNS, SSDP and WS-Discovery. Each one is a
//! [`Discoverer`] that streams [`Observation`]s into a channel as it goes, so
//! the registry sees results before the slowest probe has finished.

use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lanwatch_common::config::Config;
use lanwatch_common::device::{DiscoverySource, Observation};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub mod mdns;
pub mod neighbor;
pub mod ssdp;
pub mod wsd;

pub use mdns::MdnsDiscoverer;
pub use neighbor::NeighborTableReader;
pub use ssdp::SsdpDiscoverer;
pub use wsd::WsDiscoverer;

#[async_trait]
pub trait Discoverer: Send + Sync {
    fn source(&self) -> DiscoverySource;

    fn name(&self) -> &'static str;

    /// Upper bound on a single [`Discoverer::discover`] run.
    fn timeout(&self) -> Duration;

    /// Sends observations to `tx` until done, the deadline passes or `cancel`
    /// fires. Returning early because the receiver went away is not an error.
    async fn discover(
        &self,
        tx: mpsc::Sender<Observation>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()>;
}

/// The discoverers enabled in `config`.
pub fn from_config(config: &Config) -> Vec<Arc<dyn Discoverer>> {
    let mut discoverers: Vec<Arc<dyn Discoverer>> = Vec::new();

    if config.arp {
        discoverers.push(Arc::new(NeighborTableReader::new(
            config.arp_command.clone(),
            config.arp_timeout,
        )));
    }
    if config.mdns {
        discoverers.push(Arc::new(MdnsDiscoverer::from_config(config)));
    }
    if config.ssdp {
        discoverers.push(Arc::new(SsdpDiscoverer::new(
            config.ssdp_search_targets.clone(),
            config.ssdp_timeout,
        )));
    }
    if config.wsd {
        discoverers.push(Arc::new(WsDiscoverer::new(config.wsd_timeout)));
    }

    discoverers
}

/// Sends `observation`, returning `false` once the receiver is gone.
pub(crate) async fn emit(tx: &mpsc::Sender<Observation>, observation: Observation) -> bool {
    tx.send(observation).await.is_ok()
}

/// Reads datagrams until `deadline` or cancellation. `decode` turns each
/// payload (and its IPv4 sender) into responder addresses; every address not
/// seen before is emitted once as an online observation from `source`.
///
/// Returns the number of distinct responders.
pub(crate) async fn collect_responders<F>(
    socket: &UdpSocket,
    deadline: Instant,
    cancel: &CancellationToken,
    tx: &mpsc::Sender<Observation>,
    source: DiscoverySource,
    mut decode: F,
) -> usize
where
    F: FnMut(&str, Ipv4Addr) -> Vec<Ipv4Addr>,
{
    let mut buffer = vec![0u8; 8192];
    let mut seen: HashSet<Ipv4Addr> = HashSet::new();

    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep_until(deadline) => break,
            received = socket.recv_from(&mut buffer) => received,
        };

        let (size, sender) = match received {
            Ok(received) => received,
            Err(err) => {
                tracing::debug!("{source} receive failed: {err}");
                continue;
            }
        };

        let SocketAddr::V4(sender) = sender else {
            continue;
        };

        let payload = String::from_utf8_lossy(&buffer[..size]);
        for ip in decode(&payload, *sender.ip()) {
            if !seen.insert(ip) {
                continue;
            }
            if !emit(tx, Observation::new(ip, source).online()).await {
                return seen.len();
            }
        }
    }

    seen.len()
}

/// Ephemeral UDP socket for sending multicast queries and reading unicast
/// replies.
pub(crate) async fn multicast_socket() -> std::io::Result<UdpSocket> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    socket.set_multicast_ttl_v4(2)?;
    Ok(socket)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
