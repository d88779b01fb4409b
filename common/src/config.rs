use std::path::PathBuf;
use std::time::Duration;

use crate::policy::SourcePolicy;

/// mDNS service types browsed when the meta query yields nothing.
pub const DEFAULT_MDNS_SERVICE_TYPES: &[&str] = &[
    "_http._tcp.local.",
    "_https._tcp.local.",
    "_ssh._tcp.local.",
    "_sftp-ssh._tcp.local.",
    "_smb._tcp.local.",
    "_afpovertcp._tcp.local.",
    "_airplay._tcp.local.",
    "_raop._tcp.local.",
    "_googlecast._tcp.local.",
    "_ipp._tcp.local.",
    "_ipps._tcp.local.",
    "_printer._tcp.local.",
    "_pdl-datastream._tcp.local.",
    "_hap._tcp.local.",
    "_spotify-connect._tcp.local.",
    "_sonos._tcp.local.",
    "_rfb._tcp.local.",
    "_workstation._tcp.local.",
    "_device-info._tcp.local.",
    "_companion-link._tcp.local.",
    "_homekit._tcp.local.",
    "_daap._tcp.local.",
    "_nfs._tcp.local.",
    "_ftp._tcp.local.",
];

pub const DEFAULT_SCAN_PORTS: &[u16] = &[21, 22, 23, 25, 53, 80, 110, 143, 443, 993, 995];

pub const DEFAULT_SWEEP_PORTS: &[u16] = &[80, 443, 22];

pub const DEFAULT_SSDP_TARGETS: &[&str] = &["ssdp:all", "upnp:rootdevice"];

/// Knobs for one scan. Every field has a sensible default.
#[derive(Debug, Clone)]
pub struct Config {
    /// Browse mDNS service types.
    pub mdns: bool,
    /// Query `_services._dns-sd._udp.local.` before falling back to
    /// [`Config::mdns_service_types`].
    pub mdns_meta_query: bool,
    pub mdns_meta_timeout: Duration,
    pub mdns_timeout: Duration,
    pub mdns_service_types: Vec<String>,

    pub ssdp: bool,
    pub ssdp_timeout: Duration,
    pub ssdp_search_targets: Vec<String>,

    pub wsd: bool,
    pub wsd_timeout: Duration,

    /// Read the neighbor (ARP) table.
    pub arp: bool,
    pub arp_timeout: Duration,
    /// Program and arguments that print the neighbor table.
    pub arp_command: Vec<String>,

    /// Ports tried in order during the TCP sweep. The first alive one wins.
    pub sweep_ports: Vec<u16>,
    pub sweep_timeout: Duration,

    /// Run the ICMP fallback over hosts the TCP sweep did not find.
    pub icmp: bool,
    pub icmp_timeout: Duration,

    pub scan_ports: Vec<u16>,
    pub port_timeout: Duration,
    pub port_workers: usize,

    /// Sweep concurrency for subnets up to 256, up to 1024, and beyond.
    pub concurrency_tiers: [usize; 3],

    /// Seed from and write to the snapshot store.
    pub snapshot: bool,
    pub snapshot_path: Option<PathBuf>,

    pub source_policy: SourcePolicy,
}

impl Config {
    /// Sweep concurrency for a range of `hosts` addresses.
    pub fn concurrency_for(&self, hosts: usize) -> usize {
        let [small, medium, large] = self.concurrency_tiers;
        let tier = match hosts {
            0..=256 => small,
            257..=1024 => medium,
            _ => large,
        };
        tier.max(1)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mdns: true,
            mdns_meta_query: true,
            mdns_meta_timeout: Duration::from_millis(1500),
            mdns_timeout: Duration::from_secs(5),
            mdns_service_types: DEFAULT_MDNS_SERVICE_TYPES.iter().map(|s| s.to_string()).collect(),

            ssdp: true,
            ssdp_timeout: Duration::from_secs(4),
            ssdp_search_targets: DEFAULT_SSDP_TARGETS.iter().map(|s| s.to_string()).collect(),

            wsd: true,
            wsd_timeout: Duration::from_secs(3),

            arp: true,
            arp_timeout: Duration::from_secs(2),
            arp_command: vec!["arp".to_string(), "-an".to_string()],

            sweep_ports: DEFAULT_SWEEP_PORTS.to_vec(),
            sweep_timeout: Duration::from_millis(500),

            icmp: true,
            icmp_timeout: Duration::from_secs(1),

            scan_ports: DEFAULT_SCAN_PORTS.to_vec(),
            port_timeout: Duration::from_millis(750),
            port_workers: 8,

            concurrency_tiers: [64, 32, 16],

            snapshot: false,
            snapshot_path: None,

            source_policy: SourcePolicy::default(),
        }
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

    #[test]
    fn concurrency_tiers() {
        let config = Config::default();
        assert_eq!(config.concurrency_for(254), 64);
        assert_eq!(config.concurrency_for(256), 64);
        assert_eq!(config.concurrency_for(1022), 32);
        assert_eq!(config.concurrency_for(4094), 16);
    }

    #[test]
    fn zero_tier_still_makes_progress() {
        let config = Config {
            concurrency_tiers: [0, 0, 0],
            ..Config::default()
        };
        assert_eq!(config.concurrency_for(10), 1);
    }

    #[test]
    fn defaults_match_documented_timeouts() {
        let config = Config::default();
        assert_eq!(config.mdns_timeout, Duration::from_secs(5));
        assert_eq!(config.ssdp_timeout, Duration::from_secs(4));
        assert_eq!(config.wsd_timeout, Duration::from_secs(3));
        assert_eq!(config.arp_timeout, Duration::from_secs(2));
        assert_eq!(config.mdns_service_types.len(), 24);
        assert_eq!(config.sweep_ports, vec![80, 443, 22]);
    }
}
