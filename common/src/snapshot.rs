//! Persisted form of the device list.
//!
//! The registry exports [`DeviceRecord`]s at the end of a scan and seeds itself
//! from them at the start of the next one, keyed by
//! [`NetworkInfo::key`](crate::network::NetworkInfo::key).

use std::net::Ipv4Addr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::device::{Device, DeviceType, DiscoverySource, Service};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: String,
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<DeviceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Seconds since the Unix epoch.
    pub first_seen: u64,
    pub last_seen: u64,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_source: Option<DiscoverySource>,
}

impl DeviceRecord {
    /// Rebuilds an offline device. Records with an unparsable IP or an
    /// out-of-range timestamp are skipped.
    pub fn into_device(self) -> Option<Device> {
        let ip: Ipv4Addr = crate::network::address::parse(&self.ip)?;
        let first_seen = from_epoch_secs(self.first_seen)?;
        let last_seen = from_epoch_secs(self.last_seen)?;
        let mut device = Device::new(
            ip,
            self.discovery_source.unwrap_or(DiscoverySource::Unknown),
            first_seen,
        );
        device.id = self.id;
        device.mac = self.mac;
        device.hostname = self.hostname;
        device.manufacturer = self.vendor;
        device.name = self.name;
        device.device_type = self.device_type.unwrap_or_default();
        device.last_seen = last_seen;
        device.services = self.services.into_iter().collect();
        device.is_online = false;
        Some(device)
    }
}

impl From<&Device> for DeviceRecord {
    fn from(device: &Device) -> Self {
        Self {
            id: device.id.clone(),
            ip: device.ip.to_string(),
            mac: device.mac.clone(),
            hostname: device.hostname.clone(),
            vendor: device.manufacturer.clone(),
            device_type: Some(device.device_type),
            name: device.name.clone(),
            first_seen: epoch_secs(device.first_seen),
            last_seen: epoch_secs(device.last_seen),
            services: device.services.iter().cloned().collect(),
            discovery_source: Some(device.discovery_source),
        }
    }
}

/// Key-value persistence of device snapshots.
pub trait SnapshotStore: Send + Sync {
    fn load(&self, key: &str) -> anyhow::Result<Vec<DeviceRecord>>;
    fn save(&self, key: &str, records: &[DeviceRecord]) -> anyhow::Result<()>;
}

pub fn epoch_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// `None` when the value does not fit in a [`SystemTime`].
pub fn from_epoch_secs(secs: u64) -> Option<SystemTime> {
    UNIX_EPOCH.checked_add(Duration::from_secs(secs))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
