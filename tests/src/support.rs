use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lanwatch_common::device::{DiscoverySource, Observation, Port};
use lanwatch_common::error::ScanError;
use lanwatch_common::scan::ProbeResult;
use lanwatch_core::classifier::DeviceClassifier;
use lanwatch_core::discovery::Discoverer;
use lanwatch_core::liveness::HostProber;
use lanwatch_core::orchestrator::ScanDeps;
use lanwatch_core::ports::PortProber;
use lanwatch_core::vendors::StaticVendorLookup;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Answers TCP probes for a fixed set of addresses; ICMP never answers.
#[derive(Default)]
pub struct FakeProber {
    alive: HashSet<Ipv4Addr>,
    pub tcp_probes: AtomicUsize,
}

impl FakeProber {
    pub fn alive(ips: &[Ipv4Addr]) -> Self {
        Self {
            alive: ips.iter().copied().collect(),
            tcp_probes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl HostProber for FakeProber {
    async fn probe_tcp(&self, ip: Ipv4Addr, _port: u16, _timeout: Duration) -> ProbeResult {
        self.tcp_probes.fetch_add(1, Ordering::Relaxed);
        if self.alive.contains(&ip) {
            ProbeResult::alive(0.5)
        } else {
            ProbeResult::dead()
        }
    }

    async fn probe_icmp(&self, _ip: Ipv4Addr, _timeout: Duration) -> ProbeResult {
        ProbeResult::dead()
    }
}

/// Reports a fixed port list per host.
#[derive(Default)]
pub struct FakePortProber {
    open: HashMap<Ipv4Addr, Vec<u16>>,
    pub scans: AtomicUsize,
}

impl FakePortProber {
    pub fn with(open: impl IntoIterator<Item = (Ipv4Addr, Vec<u16>)>) -> Self {
        Self {
            open: open.into_iter().collect(),
            scans: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PortProber for FakePortProber {
    async fn scan(&self, ip: Ipv4Addr, cancel: &CancellationToken) -> Result<Vec<Port>, ScanError> {
        self.scans.fetch_add(1, Ordering::Relaxed);
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }
        let ports = self.open.get(&ip).cloned().unwrap_or_default();
        Ok(ports.into_iter().map(Port::open).collect())
    }
}

/// Replays a fixed list of observations.
pub struct ScriptedDiscoverer {
    pub source: DiscoverySource,
    pub observations: Vec<Observation>,
    pub delay: Duration,
}

impl ScriptedDiscoverer {
    pub fn new(source: DiscoverySource, observations: Vec<Observation>) -> Self {
        Self {
            source,
            observations,
            delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl Discoverer for ScriptedDiscoverer {
    fn source(&self) -> DiscoverySource {
        self.source
    }

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn discover(
        &self,
        tx: mpsc::Sender<Observation>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        tokio::select! {
            _ = cancel.cancelled() => return Err(ScanError::Cancelled.into()),
            _ = tokio::time::sleep(self.delay) => {}
        }
        for observation in self.observations.clone() {
            if tx.send(observation).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}

pub fn deps(prober: FakeProber, port_prober: Arc<FakePortProber>) -> ScanDeps {
    ScanDeps {
        prober: Arc::new(prober),
        port_prober,
        discoverers: Vec::new(),
        vendors: Arc::new(StaticVendorLookup::new([
            ("aa:bb:cc", "Synology Incorporated"),
            ("b8:27:eb", "Raspberry Pi Foundation"),
        ])),
        store: None,
        classifier: Arc::new(DeviceClassifier::default()),
    }
}
