//! Liveness passes over the whole address range.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::stream::{self, StreamExt};
use lanwatch_common::config::Config;
use lanwatch_common::device::{DiscoverySource, Observation};
use lanwatch_common::error::ScanError;
use lanwatch_common::network::NetworkInfo;
use lanwatch_common::scan::{ProbeResult, ScanProgress};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::liveness::HostProber;
use crate::registry::RegistryHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Pass {
    /// Connect to the sweep ports in order; the first alive answer wins.
    Tcp,
    /// One echo request per host.
    Icmp,
}

pub(super) struct Sweep<'a> {
    pub prober: &'a dyn HostProber,
    pub registry: &'a RegistryHandle,
    pub progress: &'a watch::Sender<ScanProgress>,
    pub cancel: &'a CancellationToken,
    pub config: &'a Config,
}

impl Sweep<'_> {
    /// Probes every host of `network` except the local address and hosts the
    /// registry already has online. Skipped hosts still count as scanned.
    ///
    /// Returns the number of hosts found alive.
    pub async fn run(&self, network: &NetworkInfo, pass: Pass) -> Result<usize, ScanError> {
        let total = network.host_count();
        self.progress.send_replace(ScanProgress::new(total));

        let online: HashSet<Ipv4Addr> = self.registry.online_ips().await?.into_iter().collect();
        let concurrency = self.config.concurrency_for(total);
        tracing::debug!("{pass:?} pass over {total} hosts, {concurrency} at a time");

        let scanned = AtomicUsize::new(0);
        let found = AtomicUsize::new(0);

        stream::iter(network.hosts())
            .for_each_concurrent(concurrency, |ip| {
                let online = &online;
                let scanned = &scanned;
                let found = &found;
                async move {
                    if self.cancel.is_cancelled() {
                        return;
                    }

                    if ip != network.local_ip && !online.contains(&ip) {
                        if let Some(result) = self.probe(ip, pass).await {
                            tracing::debug!("{ip} alive ({:?} ms)", result.rtt_millis);
                            found.fetch_add(1, Ordering::Relaxed);
                            let observation = Observation::new(ip, DiscoverySource::Ping).online();
                            if let Err(e) = self.registry.observe(observation).await {
                                tracing::error!("Failed to record {ip}: {e}");
                            }
                        }
                    }

                    let done = scanned.fetch_add(1, Ordering::Relaxed) + 1;
                    self.progress.send_replace(ScanProgress { scanned: done, total });
                }
            })
            .await;

        if self.cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }
        Ok(found.into_inner())
    }

    async fn probe(&self, ip: Ipv4Addr, pass: Pass) -> Option<ProbeResult> {
        match pass {
            Pass::Tcp => {
                for &port in &self.config.sweep_ports {
                    let result = tokio::select! {
                        _ = self.cancel.cancelled() => return None,
                        result = self.prober.probe_tcp(ip, port, self.config.sweep_timeout) => result,
                    };
                    if result.alive {
                        return Some(result);
                    }
                }
                None
            }
            Pass::Icmp => {
                let result = tokio::select! {
                    _ = self.cancel.cancelled() => return None,
                    result = self.prober.probe_icmp(ip, self.config.icmp_timeout) => result,
                };
                result.alive.then_some(result)
            }
        }
    }
}
