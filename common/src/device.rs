//! # Device model
//!
//! Everything the registry stores about a host, plus the [`Observation`]
//! that probes hand to it.

use std::collections::{BTreeMap, BTreeSet};
use std::cmp::Ordering;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::services::{self, ServiceKind};

/// Mechanism that identified a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiscoverySource {
    #[serde(rename = "mdns")]
    Mdns,
    #[serde(rename = "arp")]
    Arp,
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "ssdp")]
    Ssdp,
    #[serde(rename = "nio", alias = "wsdiscovery")]
    WsDiscovery,
    #[serde(rename = "unknown")]
    Unknown,
}

impl DiscoverySource {
    pub const ALL: [DiscoverySource; 6] = [
        DiscoverySource::Mdns,
        DiscoverySource::Arp,
        DiscoverySource::Ping,
        DiscoverySource::Ssdp,
        DiscoverySource::WsDiscovery,
        DiscoverySource::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DiscoverySource::Mdns => "mdns",
            DiscoverySource::Arp => "arp",
            DiscoverySource::Ping => "ping",
            DiscoverySource::Ssdp => "ssdp",
            DiscoverySource::WsDiscovery => "nio",
            DiscoverySource::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscoverySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mdns" => Ok(DiscoverySource::Mdns),
            "arp" => Ok(DiscoverySource::Arp),
            "ping" => Ok(DiscoverySource::Ping),
            "ssdp" => Ok(DiscoverySource::Ssdp),
            "nio" | "wsdiscovery" => Ok(DiscoverySource::WsDiscovery),
            "unknown" => Ok(DiscoverySource::Unknown),
            other => Err(format!("unknown discovery source: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortStatus {
    Open,
    Closed,
    Filtered,
}

/// A scanned TCP port. Two ports are the same port when their numbers match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub number: u16,
    pub service_name: String,
    pub description: String,
    pub status: PortStatus,
}

impl Port {
    /// An open port, named from the well-known port table.
    pub fn open(number: u16) -> Self {
        let (name, description) = services::port_info(number);
        Self {
            number,
            service_name: name.to_string(),
            description: description.to_string(),
            status: PortStatus::Open,
        }
    }
}

impl PartialEq for Port {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for Port {}

impl PartialOrd for Port {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Port {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number.cmp(&other.number)
    }
}

/// A service a device offers. Identity is `(kind, port)`, so HTTP on 80 and
/// HTTP on 8080 are two services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub kind: ServiceKind,
    pub port: Option<u16>,
}

impl Service {
    pub fn new(kind: ServiceKind, port: Option<u16>) -> Self {
        Self {
            name: kind.label().to_string(),
            kind,
            port,
        }
    }

    pub fn from_port(port: u16) -> Option<Self> {
        ServiceKind::from_port(port).map(|kind| Service::new(kind, Some(port)))
    }

    fn key(&self) -> (ServiceKind, Option<u16>) {
        (self.kind, self.port)
    }
}

impl PartialEq for Service {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Service {}

impl PartialOrd for Service {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Service {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.name, port),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    Router,
    Printer,
    Tv,
    PlayStation,
    Laptop,
    Computer,
    Phone,
    Tablet,
    Nas,
    Camera,
    Speaker,
    IoT,
    #[default]
    Unknown,
}

impl DeviceType {
    pub fn label(self) -> &'static str {
        match self {
            DeviceType::Router => "Router",
            DeviceType::Printer => "Printer",
            DeviceType::Tv => "TV",
            DeviceType::PlayStation => "PlayStation",
            DeviceType::Laptop => "Laptop",
            DeviceType::Computer => "Computer",
            DeviceType::Phone => "Phone",
            DeviceType::Tablet => "Tablet",
            DeviceType::Nas => "NAS",
            DeviceType::Camera => "Camera",
            DeviceType::Speaker => "Speaker",
            DeviceType::IoT => "IoT",
            DeviceType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Canonical record of one host.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: String,
    pub ip: Ipv4Addr,
    pub discovery_source: DiscoverySource,
    pub hostname: Option<String>,
    pub mac: Option<String>,
    pub manufacturer: Option<String>,
    pub name: Option<String>,
    pub device_type: DeviceType,
    pub is_online: bool,
    pub services: BTreeSet<Service>,
    pub open_ports: BTreeSet<Port>,
    pub first_seen: SystemTime,
    pub last_seen: SystemTime,
    pub confidence: Option<f32>,
    pub fingerprints: BTreeMap<String, String>,
}

impl Device {
    pub fn new(ip: Ipv4Addr, source: DiscoverySource, now: SystemTime) -> Self {
        Self {
            id: ip.to_string(),
            ip,
            discovery_source: source,
            hostname: None,
            mac: None,
            manufacturer: None,
            name: None,
            device_type: DeviceType::Unknown,
            is_online: false,
            services: BTreeSet::new(),
            open_ports: BTreeSet::new(),
            first_seen: now,
            last_seen: now,
            confidence: None,
            fingerprints: BTreeMap::new(),
        }
    }

    pub fn port_numbers(&self) -> Vec<u16> {
        self.open_ports.iter().map(|port| port.number).collect()
    }

    pub fn has_service(&self, kind: ServiceKind) -> bool {
        self.services.iter().any(|service| service.kind == kind)
    }

    /// Best human label: explicit name, then hostname, then IP.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.hostname.clone())
            .unwrap_or_else(|| self.ip.to_string())
    }
}

/// One row of the platform neighbor table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpEntry {
    pub ip: Ipv4Addr,
    pub mac: String,
    pub interface: String,
}

/// Input to the registry: what one probe learned about one host.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub ip: Ipv4Addr,
    pub source: DiscoverySource,
    pub is_online: bool,
    pub hostname: Option<String>,
    pub services: Vec<Service>,
    pub open_ports: Vec<Port>,
    pub mac: Option<String>,
}

impl Observation {
    pub fn new(ip: Ipv4Addr, source: DiscoverySource) -> Self {
        Self {
            ip,
            source,
            is_online: false,
            hostname: None,
            services: Vec::new(),
            open_ports: Vec::new(),
            mac: None,
        }
    }

    pub fn online(mut self) -> Self {
        self.is_online = true;
        self
    }

    pub fn offline(mut self) -> Self {
        self.is_online = false;
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        let hostname = hostname.into();
        let trimmed = hostname.trim().trim_end_matches('.');
        if !trimmed.is_empty() {
            self.hostname = Some(trimmed.to_string());
        }
        self
    }

    pub fn with_mac(mut self, mac: impl Into<String>) -> Self {
        self.mac = Some(mac.into());
        self
    }

    pub fn with_service(mut self, service: Service) -> Self {
        self.services.push(service);
        self
    }

    pub fn with_services(mut self, services: impl IntoIterator<Item = Service>) -> Self {
        self.services.extend(services);
        self
    }

    pub fn with_port(mut self, port: Port) -> Self {
        self.open_ports.push(port);
        self
    }

    pub fn with_ports(mut self, ports: impl IntoIterator<Item = Port>) -> Self {
        self.open_ports.extend(ports);
        self
    }
}

impl From<ArpEntry> for Observation {
    fn from(entry: ArpEntry) -> Self {
        Observation::new(entry.ip, DiscoverySource::Arp)
            .online()
            .with_mac(entry.mac)
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
