//! Port scans requested by the registry, at most one per host per scan.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lanwatch_common::device::{Device, DiscoverySource, Observation};
use lanwatch_common::warn;
use tokio::sync::{OwnedMutexGuard, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::ports::{self, PortProber};
use crate::registry::{RegistryEvent, RegistryHandle};

struct PortScanEntry {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

/// IP-keyed table of the port scans started during one scan.
#[derive(Default)]
pub(super) struct PortScanTable {
    entries: Mutex<HashMap<Ipv4Addr, PortScanEntry>>,
}

impl PortScanTable {
    fn lock(&self) -> MutexGuard<'_, HashMap<Ipv4Addr, PortScanEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a scan of `ip` unless one was already started or `parent` is
    /// cancelled. Open ports are fed back into the registry.
    pub fn schedule(
        &self,
        ip: Ipv4Addr,
        parent: &CancellationToken,
        prober: Arc<dyn PortProber>,
        registry: RegistryHandle,
    ) -> bool {
        let mut entries = self.lock();
        if parent.is_cancelled() || entries.contains_key(&ip) {
            return false;
        }

        let token = parent.child_token();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            let open = match prober.scan(ip, &task_token).await {
                Ok(open) => open,
                Err(e) if e.is_cancelled() => return,
                Err(e) => {
                    warn!("Port scan of {ip} failed: {e}");
                    return;
                }
            };
            tracing::debug!("{ip}: {} open ports", open.len());
            if open.is_empty() {
                return;
            }

            let services = ports::services_for(&open);
            let observation = Observation::new(ip, DiscoverySource::Unknown)
                .online()
                .with_ports(open)
                .with_services(services);
            if let Err(e) = registry.observe(observation).await {
                tracing::error!("Failed to record ports of {ip}: {e}");
            }
        });

        entries.insert(
            ip,
            PortScanEntry {
                token,
                handle: Some(handle),
            },
        );
        true
    }

    /// Handles of scans nobody is waiting on yet.
    pub fn take_pending(&self) -> Vec<JoinHandle<()>> {
        self.lock()
            .values_mut()
            .filter_map(|entry| entry.handle.take())
            .collect()
    }

    pub fn cancel_all(&self) {
        for entry in self.lock().values() {
            entry.token.cancel();
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Consumes registry events for the duration of one scan: forwards device
/// updates, starts requested port scans and releases flush barriers.
pub(super) struct EventPump {
    pub events: OwnedMutexGuard<mpsc::UnboundedReceiver<RegistryEvent>>,
    pub stop: CancellationToken,
    pub cancel: CancellationToken,
    pub table: Arc<PortScanTable>,
    pub prober: Arc<dyn PortProber>,
    pub registry: RegistryHandle,
    pub updates: mpsc::UnboundedSender<Device>,
}

impl EventPump {
    /// Drops events left over from an earlier scan.
    pub fn drain_stale(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            if let RegistryEvent::Barrier(token) = event {
                token.release();
            }
        }
    }

    pub async fn run(mut self) {
        loop {
            let event = tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                event = self.events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            match event {
                RegistryEvent::DeviceUpdated(device) => {
                    let _ = self.updates.send(device);
                }
                RegistryEvent::PortScanWanted(ip) => {
                    if self.table.schedule(
                        ip,
                        &self.cancel,
                        self.prober.clone(),
                        self.registry.clone(),
                    ) {
                        tracing::debug!("Port scan of {ip} scheduled");
                    }
                }
                RegistryEvent::Barrier(token) => token.release(),
            }
        }
    }
}
