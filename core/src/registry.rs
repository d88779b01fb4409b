//! # Device registry
//!
//! The canonical per-IP device table. All mutation goes through one task
//! (the [`RegistryActor`]) which owns the map; everyone else talks to it
//! through a cloneable [`RegistryHandle`].
//!
//! [`DeviceMerger`] holds the merge rules themselves and is plain synchronous
//! code:
//!
//! * loopback, unspecified and broadcast addresses are refused,
//! * the recorded discovery source only moves up the [`SourcePolicy`] ranks,
//! * `is_online` always takes the latest value,
//! * ports and services are set unions,
//! * hostname, MAC and vendor are written once and never overwritten,
//! * classification is re-run whenever its inputs changed.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::SystemTime;

use lanwatch_common::device::{Device, Observation};
use lanwatch_common::error::ScanError;
use lanwatch_common::network::{address, mac};
use lanwatch_common::policy::SourcePolicy;
use lanwatch_common::snapshot::DeviceRecord;
use lanwatch_common::vendors::VendorLookup;
use lanwatch_common::warn;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::classifier::DeviceClassifier;

const COMMAND_BUFFER: usize = 256;

/// Emitted by the actor after it has finished with a command.
#[derive(Debug)]
pub enum RegistryEvent {
    /// A device changed; carries the classified state.
    DeviceUpdated(Device),
    /// The device is online and has no known ports yet.
    PortScanWanted(Ipv4Addr),
    /// Every event before this one has been emitted. Release it to unblock
    /// [`RegistryHandle::flush`].
    Barrier(FlushToken),
}

#[derive(Debug)]
pub struct FlushToken(oneshot::Sender<()>);

impl FlushToken {
    pub fn release(self) {
        let _ = self.0.send(());
    }
}

/// Result of merging one observation.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub device: Device,
    /// Hostname, vendor, ports or services changed.
    pub reclassify: bool,
    pub wants_port_scan: bool,
}

/// Merge rules over an owned device map.
pub struct DeviceMerger {
    devices: HashMap<Ipv4Addr, Device>,
    policy: SourcePolicy,
    classifier: Arc<DeviceClassifier>,
    vendors: Arc<dyn VendorLookup>,
    broadcast: Option<Ipv4Addr>,
}

impl DeviceMerger {
    pub fn new(
        policy: SourcePolicy,
        classifier: Arc<DeviceClassifier>,
        vendors: Arc<dyn VendorLookup>,
        broadcast: Option<Ipv4Addr>,
    ) -> Self {
        Self {
            devices: HashMap::new(),
            policy,
            classifier,
            vendors,
            broadcast,
        }
    }

    pub fn set_broadcast(&mut self, broadcast: Option<Ipv4Addr>) {
        self.broadcast = broadcast;
    }

    pub fn is_admissible(&self, ip: Ipv4Addr) -> bool {
        !address::is_reserved(ip) && Some(ip) != self.broadcast
    }

    /// Folds `observation` into the table. `None` if the address is refused.
    pub fn merge(&mut self, observation: Observation, now: SystemTime) -> Option<MergeOutcome> {
        let ip = observation.ip;
        if !self.is_admissible(ip) {
            tracing::debug!("refusing observation for {ip}");
            return None;
        }

        let policy = &self.policy;
        let device = self
            .devices
            .entry(ip)
            .or_insert_with(|| Device::new(ip, policy.initial_source(observation.source), now));

        if policy.should_replace(device.discovery_source, observation.source) {
            device.discovery_source = observation.source;
        }

        device.is_online = observation.is_online;
        device.last_seen = now;

        let mut reclassify = false;

        let ports_before = device.open_ports.len();
        device.open_ports.extend(observation.open_ports);
        reclassify |= device.open_ports.len() != ports_before;

        let services_before = device.services.len();
        device.services.extend(observation.services);
        reclassify |= device.services.len() != services_before;

        if device.hostname.is_none() {
            if let Some(hostname) = observation.hostname.filter(|h| !h.trim().is_empty()) {
                device.hostname = Some(hostname);
                reclassify = true;
            }
        }

        if device.mac.is_none() {
            if let Some(mac) = observation.mac.as_deref().and_then(mac::normalize) {
                device.mac = Some(mac);
            }
        }

        if device.manufacturer.is_none() {
            if let Some(vendor) = device.mac.as_deref().and_then(|mac| self.vendors.find_vendor(mac)) {
                device.manufacturer = Some(vendor);
                reclassify = true;
            }
        }

        let wants_port_scan = device.is_online && device.open_ports.is_empty();

        Some(MergeOutcome {
            device: device.clone(),
            reclassify,
            wants_port_scan,
        })
    }

    /// Re-runs classification for `ip` and stores the result.
    pub fn classify(&mut self, ip: Ipv4Addr) -> Option<&Device> {
        let device = self.devices.get_mut(&ip)?;
        let classification = self.classifier.classify_device(device);
        device.device_type = classification.device_type;
        device.confidence = Some(classification.confidence);
        device.fingerprints = classification.fingerprints;
        Some(device)
    }

    pub fn device(&self, ip: Ipv4Addr) -> Option<&Device> {
        self.devices.get(&ip)
    }

    /// All devices, ascending by numeric address.
    pub fn devices(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.devices.values().cloned().collect();
        devices.sort_by_key(|device| device.ip);
        devices
    }

    pub fn online_ips(&self) -> Vec<Ipv4Addr> {
        let mut ips: Vec<Ipv4Addr> = self
            .devices
            .values()
            .filter(|device| device.is_online)
            .map(|device| device.ip)
            .collect();
        ips.sort();
        ips
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }

    pub fn mark_all_offline(&mut self) {
        for device in self.devices.values_mut() {
            device.is_online = false;
        }
    }

    /// Loads persisted records as offline devices. Addresses already present
    /// are left alone. Returns how many were added.
    pub fn seed(&mut self, records: Vec<DeviceRecord>) -> usize {
        let mut added = 0;
        for record in records {
            let id = record.id.clone();
            let Some(device) = record.into_device() else {
                warn!("Skipping unreadable snapshot record {id}");
                continue;
            };
            if !self.is_admissible(device.ip) || self.devices.contains_key(&device.ip) {
                continue;
            }
            self.devices.insert(device.ip, device);
            added += 1;
        }
        added
    }

    pub fn records(&self) -> Vec<DeviceRecord> {
        self.devices().iter().map(DeviceRecord::from).collect()
    }
}

enum Command {
    Observe(Observation, oneshot::Sender<Option<Device>>),
    Device(Ipv4Addr, oneshot::Sender<Option<Device>>),
    Devices(oneshot::Sender<Vec<Device>>),
    OnlineIps(oneshot::Sender<Vec<Ipv4Addr>>),
    Len(oneshot::Sender<usize>),
    Clear(oneshot::Sender<()>),
    MarkAllOffline(oneshot::Sender<()>),
    Seed(Vec<DeviceRecord>, oneshot::Sender<usize>),
    Records(oneshot::Sender<Vec<DeviceRecord>>),
    SetBroadcast(Option<Ipv4Addr>, oneshot::Sender<()>),
    Flush(oneshot::Sender<()>),
}

/// Task that owns a [`DeviceMerger`] and serves [`RegistryHandle`] requests
/// one at a time.
pub struct RegistryActor {
    merger: DeviceMerger,
    commands: mpsc::Receiver<Command>,
    events: mpsc::UnboundedSender<RegistryEvent>,
}

impl RegistryActor {
    /// Runs until every handle is dropped, then gives the merger back.
    pub async fn run(mut self) -> DeviceMerger {
        while let Some(command) = self.commands.recv().await {
            self.handle(command);
        }
        self.merger
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Observe(observation, reply) => self.observe(observation, reply),
            Command::Device(ip, reply) => {
                let _ = reply.send(self.merger.device(ip).cloned());
            }
            Command::Devices(reply) => {
                let _ = reply.send(self.merger.devices());
            }
            Command::OnlineIps(reply) => {
                let _ = reply.send(self.merger.online_ips());
            }
            Command::Len(reply) => {
                let _ = reply.send(self.merger.len());
            }
            Command::Clear(reply) => {
                self.merger.clear();
                let _ = reply.send(());
            }
            Command::MarkAllOffline(reply) => {
                self.merger.mark_all_offline();
                let _ = reply.send(());
            }
            Command::Seed(records, reply) => {
                let _ = reply.send(self.merger.seed(records));
            }
            Command::Records(reply) => {
                let _ = reply.send(self.merger.records());
            }
            Command::SetBroadcast(broadcast, reply) => {
                self.merger.set_broadcast(broadcast);
                let _ = reply.send(());
            }
            Command::Flush(ack) => {
                if let Err(mpsc::error::SendError(RegistryEvent::Barrier(token))) =
                    self.events.send(RegistryEvent::Barrier(FlushToken(ack)))
                {
                    token.release();
                }
            }
        }
    }

    fn observe(&mut self, observation: Observation, reply: oneshot::Sender<Option<Device>>) {
        let ip = observation.ip;
        let Some(outcome) = self.merger.merge(observation, SystemTime::now()) else {
            let _ = reply.send(None);
            return;
        };

        let _ = reply.send(Some(outcome.device.clone()));

        let device = if outcome.reclassify {
            self.merger.classify(ip).cloned().unwrap_or(outcome.device)
        } else {
            outcome.device
        };

        let _ = self.events.send(RegistryEvent::DeviceUpdated(device));
        if outcome.wants_port_scan {
            let _ = self.events.send(RegistryEvent::PortScanWanted(ip));
        }
    }
}

/// Cloneable front door to the registry task.
#[derive(Clone)]
pub struct RegistryHandle {
    commands: mpsc::Sender<Command>,
}

impl RegistryHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ScanError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| ScanError::Registry("registry task stopped".into()))?;
        response
            .await
            .map_err(|_| ScanError::Registry("registry dropped the request".into()))
    }

    /// Merges one observation. Returns the merged device, or `None` when
    /// the address is not admissible.
    pub async fn observe(&self, observation: Observation) -> Result<Option<Device>, ScanError> {
        self.request(|reply| Command::Observe(observation, reply)).await
    }

    pub async fn device(&self, ip: Ipv4Addr) -> Result<Option<Device>, ScanError> {
        self.request(|reply| Command::Device(ip, reply)).await
    }

    pub async fn devices(&self) -> Result<Vec<Device>, ScanError> {
        self.request(Command::Devices).await
    }

    pub async fn online_ips(&self) -> Result<Vec<Ipv4Addr>, ScanError> {
        self.request(Command::OnlineIps).await
    }

    pub async fn len(&self) -> Result<usize, ScanError> {
        self.request(Command::Len).await
    }

    pub async fn clear(&self) -> Result<(), ScanError> {
        self.request(Command::Clear).await
    }

    pub async fn mark_all_offline(&self) -> Result<(), ScanError> {
        self.request(Command::MarkAllOffline).await
    }

    pub async fn seed(&self, records: Vec<DeviceRecord>) -> Result<usize, ScanError> {
        self.request(|reply| Command::Seed(records, reply)).await
    }

    pub async fn records(&self) -> Result<Vec<DeviceRecord>, ScanError> {
        self.request(Command::Records).await
    }

    pub async fn set_broadcast(&self, broadcast: Option<Ipv4Addr>) -> Result<(), ScanError> {
        self.request(|reply| Command::SetBroadcast(broadcast, reply)).await
    }

    /// Waits until every event caused by earlier commands has been received
    /// and the resulting barrier released.
    pub async fn flush(&self) -> Result<(), ScanError> {
        let (ack, released) = oneshot::channel();
        self.commands
            .send(Command::Flush(ack))
            .await
            .map_err(|_| ScanError::Registry("registry task stopped".into()))?;
        let _ = released.await;
        Ok(())
    }
}

/// Starts the registry task.
pub fn spawn(
    merger: DeviceMerger,
) -> (
    RegistryHandle,
    mpsc::UnboundedReceiver<RegistryEvent>,
    JoinHandle<DeviceMerger>,
) {
    let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
    let (events, events_rx) = mpsc::unbounded_channel();

    let actor = RegistryActor {
        merger,
        commands,
        events,
    };
    let task = tokio::spawn(actor.run());

    (RegistryHandle { commands: commands_tx }, events_rx, task)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
