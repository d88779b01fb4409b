//! # Scan orchestration
//!
//! One subnet scan runs as a single task through fixed phases:
//!
//! 1. seed the registry from the snapshot store,
//! 2. passive and multicast discovery, all probes at once,
//! 3. TCP sweep of the remaining addresses,
//! 4. ICMP fallback for hosts that stayed silent,
//! 5. a neighbor-table re-read, which now holds entries for every host the
//!    sweeps talked to,
//! 6. waiting on the per-host port scans started along the way,
//! 7. persisting the result.
//!
//! Everything observes one [`CancellationToken`]; cancelling it ends the scan
//! early with whatever the registry holds at that point.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures::future::join_all;
use lanwatch_common::config::Config;
use lanwatch_common::device::{Device, DiscoverySource, Observation};
use lanwatch_common::error::{self, ScanError};
use lanwatch_common::network::NetworkInfo;
use lanwatch_common::scan::{ScanPhase, ScanProgress};
use lanwatch_common::snapshot::SnapshotStore;
use lanwatch_common::vendors::VendorLookup;
use lanwatch_common::{info, success, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::classifier::DeviceClassifier;
use crate::discovery::{self, Discoverer};
use crate::liveness::{HostProber, SystemProber};
use crate::ports::{PortProber, TcpPortScanner};
use crate::registry::{self, DeviceMerger, RegistryEvent, RegistryHandle};
use crate::store::JsonFileStore;
use crate::vendors::OuiVendorLookup;

mod port_scans;
mod sweep;

use port_scans::{EventPump, PortScanTable};
use sweep::{Pass, Sweep};

const OBSERVATION_BUFFER: usize = 256;
const DISCOVERY_GRACE: Duration = Duration::from_secs(1);

/// Collaborators of a scan. [`ScanDeps::system`] wires the real ones; tests
/// swap in fakes.
#[derive(Clone)]
pub struct ScanDeps {
    pub prober: Arc<dyn HostProber>,
    pub port_prober: Arc<dyn PortProber>,
    pub discoverers: Vec<Arc<dyn Discoverer>>,
    pub vendors: Arc<dyn VendorLookup>,
    pub store: Option<Arc<dyn SnapshotStore>>,
    pub classifier: Arc<DeviceClassifier>,
}

impl ScanDeps {
    pub fn system(config: &Config) -> Self {
        let store = config
            .snapshot_path
            .as_ref()
            .filter(|_| config.snapshot)
            .map(|path| Arc::new(JsonFileStore::new(path)) as Arc<dyn SnapshotStore>);

        Self {
            prober: Arc::new(SystemProber),
            port_prober: Arc::new(TcpPortScanner::from_config(config)),
            discoverers: discovery::from_config(config),
            vendors: Arc::new(OuiVendorLookup),
            store,
            classifier: Arc::new(DeviceClassifier::default()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub network: NetworkInfo,
    /// Ascending by address.
    pub devices: Vec<Device>,
    pub progress: ScanProgress,
    pub elapsed: Duration,
    pub cancelled: bool,
}

impl ScanOutcome {
    pub fn online(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter().filter(|device| device.is_online)
    }
}

/// Owns the device registry across scans.
pub struct ScanOrchestrator {
    config: Arc<Config>,
    deps: ScanDeps,
    registry: RegistryHandle,
    events: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<RegistryEvent>>>,
    last_network: Arc<Mutex<Option<String>>>,
}

impl ScanOrchestrator {
    /// Spawns the registry task, so it must be called inside a runtime.
    pub fn new(config: Config, deps: ScanDeps) -> Self {
        let merger = DeviceMerger::new(
            config.source_policy.clone(),
            deps.classifier.clone(),
            deps.vendors.clone(),
            None,
        );
        let (registry, events, _task) = registry::spawn(merger);

        Self {
            config: Arc::new(config),
            deps,
            registry,
            events: Arc::new(tokio::sync::Mutex::new(events)),
            last_network: Arc::new(Mutex::new(None)),
        }
    }

    pub fn registry(&self) -> RegistryHandle {
        self.registry.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn start(&self, network: NetworkInfo) -> ScanHandle {
        let cancel = CancellationToken::new();
        let (progress_tx, progress) = watch::channel(ScanProgress::default());
        let (phase_tx, phase) = watch::channel(ScanPhase::Idle);
        let (updates_tx, updates) = mpsc::unbounded_channel();
        let port_scans = Arc::new(PortScanTable::default());

        let run = ScanRun {
            config: self.config.clone(),
            deps: self.deps.clone(),
            network,
            registry: self.registry.clone(),
            events: self.events.clone(),
            last_network: self.last_network.clone(),
            cancel: cancel.clone(),
            progress: progress_tx,
            phase: phase_tx,
            updates: updates_tx,
            port_scans: port_scans.clone(),
        };

        ScanHandle {
            cancel,
            port_scans,
            progress,
            phase,
            updates: Some(updates),
            registry: self.registry.clone(),
            task: tokio::spawn(run.run()),
        }
    }

    /// Runs a scan to completion.
    pub async fn scan(&self, network: NetworkInfo) -> anyhow::Result<ScanOutcome> {
        self.start(network).wait().await
    }
}

/// A running scan.
pub struct ScanHandle {
    cancel: CancellationToken,
    port_scans: Arc<PortScanTable>,
    progress: watch::Receiver<ScanProgress>,
    phase: watch::Receiver<ScanPhase>,
    updates: Option<mpsc::UnboundedReceiver<Device>>,
    registry: RegistryHandle,
    task: JoinHandle<anyhow::Result<ScanOutcome>>,
}

impl ScanHandle {
    pub fn progress(&self) -> watch::Receiver<ScanProgress> {
        self.progress.clone()
    }

    pub fn phase(&self) -> ScanPhase {
        *self.phase.borrow()
    }

    pub fn phases(&self) -> watch::Receiver<ScanPhase> {
        self.phase.clone()
    }

    /// Devices as the registry updates them. Only the first call gets the
    /// stream.
    pub fn take_updates(&mut self) -> Option<mpsc::UnboundedReceiver<Device>> {
        self.updates.take()
    }

    pub fn registry(&self) -> RegistryHandle {
        self.registry.clone()
    }

    /// Cancels the scan from another task while this handle is awaited.
    pub fn canceller(&self) -> ScanCanceller {
        ScanCanceller {
            cancel: self.cancel.clone(),
            port_scans: self.port_scans.clone(),
        }
    }

    pub fn cancel_scan(&self) {
        self.canceller().cancel_scan();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn wait(self) -> anyhow::Result<ScanOutcome> {
        self.task.await?
    }
}

#[derive(Clone)]
pub struct ScanCanceller {
    cancel: CancellationToken,
    port_scans: Arc<PortScanTable>,
}

impl ScanCanceller {
    /// Cancels the main token and every port scan started so far.
    pub fn cancel_scan(&self) {
        self.cancel.cancel();
        self.port_scans.cancel_all();
    }
}

struct ScanRun {
    config: Arc<Config>,
    deps: ScanDeps,
    network: NetworkInfo,
    registry: RegistryHandle,
    events: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<RegistryEvent>>>,
    last_network: Arc<Mutex<Option<String>>>,
    cancel: CancellationToken,
    progress: watch::Sender<ScanProgress>,
    phase: watch::Sender<ScanPhase>,
    updates: mpsc::UnboundedSender<Device>,
    port_scans: Arc<PortScanTable>,
}

impl ScanRun {
    async fn run(self) -> anyhow::Result<ScanOutcome> {
        let started = Instant::now();
        info!("Scanning {}", self.network);

        let stop = CancellationToken::new();
        let mut pump = EventPump {
            events: self.events.clone().lock_owned().await,
            stop: stop.clone(),
            cancel: self.cancel.clone(),
            table: self.port_scans.clone(),
            prober: self.deps.port_prober.clone(),
            registry: self.registry.clone(),
            updates: self.updates.clone(),
        };
        pump.drain_stale();
        let pump = tokio::spawn(pump.run());

        let result = self.phases().await;
        let cancelled = match result {
            Ok(()) => false,
            Err(e) if error::is_cancelled(&e) => true,
            Err(e) => {
                self.port_scans.cancel_all();
                stop.cancel();
                let _ = pump.await;
                return Err(e);
            }
        };

        if cancelled {
            self.port_scans.cancel_all();
        }
        stop.cancel();
        let _ = pump.await;

        let devices = self.registry.devices().await?;
        let progress = *self.progress.borrow();
        let elapsed = started.elapsed();

        if cancelled {
            self.set_phase(ScanPhase::Cancelled);
            warn!("Scan cancelled after {:.1}s", elapsed.as_secs_f64());
        } else {
            self.set_phase(ScanPhase::Finished);
            let online = devices.iter().filter(|device| device.is_online).count();
            success!("Found {online} hosts in {:.1}s", elapsed.as_secs_f64());
        }

        Ok(ScanOutcome {
            network: self.network,
            devices,
            progress,
            elapsed,
            cancelled,
        })
    }

    async fn phases(&self) -> anyhow::Result<()> {
        self.prepare().await?;
        self.check_cancelled()?;

        self.set_phase(ScanPhase::Discovery);
        self.discover(&self.deps.discoverers).await?;

        self.set_phase(ScanPhase::TcpSweep);
        let found = self.sweep().run(&self.network, Pass::Tcp).await?;
        tracing::debug!("TCP sweep found {found} hosts");

        if self.config.icmp {
            self.set_phase(ScanPhase::IcmpFallback);
            let found = self.sweep().run(&self.network, Pass::Icmp).await?;
            tracing::debug!("ICMP fallback found {found} hosts");
        }

        let neighbor_tables: Vec<Arc<dyn Discoverer>> = self
            .deps
            .discoverers
            .iter()
            .filter(|discoverer| discoverer.source() == DiscoverySource::Arp)
            .cloned()
            .collect();
        if !neighbor_tables.is_empty() {
            self.discover(&neighbor_tables).await?;
        }

        self.set_phase(ScanPhase::PortScan);
        self.await_port_scans().await?;

        self.persist().await?;
        Ok(())
    }

    fn sweep(&self) -> Sweep<'_> {
        Sweep {
            prober: self.deps.prober.as_ref(),
            registry: &self.registry,
            progress: &self.progress,
            cancel: &self.cancel,
            config: &self.config,
        }
    }

    fn set_phase(&self, phase: ScanPhase) {
        tracing::debug!("Phase: {phase}");
        self.phase.send_replace(phase);
    }

    fn check_cancelled(&self) -> Result<(), ScanError> {
        if self.cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }
        Ok(())
    }

    /// A new network starts from an empty registry; the same network keeps
    /// its devices but marks them offline until seen again.
    async fn prepare(&self) -> anyhow::Result<()> {
        let key = self.network.key();
        let previous = self
            .last_network
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(key.clone());

        if previous.as_deref() == Some(key.as_str()) {
            self.registry.mark_all_offline().await?;
        } else {
            self.registry.clear().await?;
        }
        self.registry.set_broadcast(Some(self.network.broadcast)).await?;

        if let Some(store) = self.store() {
            match store.load(&key) {
                Ok(records) => {
                    let restored = self.registry.seed(records).await?;
                    if restored > 0 {
                        info!("Restored {restored} known devices for {key}");
                    }
                }
                Err(e) => warn!("Failed to load snapshot for {key}: {e:#}"),
            }
        }
        Ok(())
    }

    /// Runs `discoverers` concurrently and feeds everything they report into
    /// the registry as it arrives.
    async fn discover(&self, discoverers: &[Arc<dyn Discoverer>]) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::channel::<Observation>(OBSERVATION_BUFFER);

        let probes: Vec<_> = discoverers
            .iter()
            .cloned()
            .map(|discoverer| {
                let tx = tx.clone();
                let cancel = self.cancel.clone();
                tokio::spawn(run_discoverer(discoverer, tx, cancel))
            })
            .collect();
        drop(tx);

        while let Some(observation) = rx.recv().await {
            self.registry.observe(observation).await?;
        }

        for joined in join_all(probes).await {
            if let Err(e) = joined {
                tracing::error!("Discovery task failed: {e}");
            }
        }

        self.check_cancelled()?;
        Ok(())
    }

    async fn await_port_scans(&self) -> anyhow::Result<()> {
        loop {
            self.check_cancelled()?;

            // Every PortScanWanted emitted so far has reached the pump.
            self.registry.flush().await?;

            let pending = self.port_scans.take_pending();
            if pending.is_empty() {
                tracing::debug!("{} port scans done", self.port_scans.len());
                return Ok(());
            }

            let joined = tokio::select! {
                _ = self.cancel.cancelled() => return Err(ScanError::Cancelled.into()),
                joined = join_all(pending) => joined,
            };
            for result in joined {
                if let Err(e) = result {
                    tracing::error!("Port scan task failed: {e}");
                }
            }
        }
    }

    async fn persist(&self) -> anyhow::Result<()> {
        let Some(store) = self.store() else {
            return Ok(());
        };

        let key = self.network.key();
        let records = self.registry.records().await?;
        match store.save(&key, &records) {
            Ok(()) => tracing::debug!("Saved {} devices for {key}", records.len()),
            Err(e) => warn!("Failed to save snapshot for {key}: {e:#}"),
        }
        Ok(())
    }

    fn store(&self) -> Option<&Arc<dyn SnapshotStore>> {
        self.deps.store.as_ref().filter(|_| self.config.snapshot)
    }
}

async fn run_discoverer(
    discoverer: Arc<dyn Discoverer>,
    tx: mpsc::Sender<Observation>,
    cancel: CancellationToken,
) {
    let name = discoverer.name();
    let budget = discoverer.timeout() + DISCOVERY_GRACE;

    match tokio::time::timeout(budget, discoverer.discover(tx, cancel)).await {
        Ok(Ok(())) => tracing::debug!("{name} finished"),
        Ok(Err(e)) if error::is_cancelled(&e) => tracing::debug!("{name} cancelled"),
        Ok(Err(e)) => warn!("{name} failed: {e:#}"),
        Err(_) => tracing::debug!("{name} timed out after {budget:?}"),
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
