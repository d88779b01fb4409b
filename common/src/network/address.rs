//! # IPv4 address arithmetic
//!
//! Parsing, network/broadcast derivation and host-range enumeration for the
//! subnet being scanned. Addresses are `Ipv4Addr` throughout; their `u32`
//! form is used for the bit arithmetic and gives the numeric ordering that
//! device lists are sorted by.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::error::ScanError;
use crate::network::range::Ipv4Range;

/// Strict dotted-quad parse.
///
/// Rejects anything that is not exactly four decimal octets in `0..=255`:
/// signs, surrounding whitespace, empty octets and trailing dots all yield
/// `None`.
pub fn parse(input: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut count = 0;

    for part in input.split('.') {
        if count == 4 || part.is_empty() || part.len() > 3 {
            return None;
        }
        if !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        octets[count] = part.parse::<u8>().ok()?;
        count += 1;
    }

    (count == 4).then(|| Ipv4Addr::from(octets))
}

pub fn network(ip: Ipv4Addr, mask: Ipv4Addr) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(ip) & u32::from(mask))
}

pub fn broadcast(ip: Ipv4Addr, mask: Ipv4Addr) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(ip) | !u32::from(mask))
}

/// Number of set bits in the mask.
pub fn netmask_prefix(mask: Ipv4Addr) -> u8 {
    u32::from(mask).count_ones() as u8
}

/// Inverse of [`netmask_prefix`]. Prefixes above 32 saturate to `/32`.
pub fn prefix_to_mask(prefix: u8) -> Ipv4Addr {
    match prefix {
        0 => Ipv4Addr::UNSPECIFIED,
        p if p >= 32 => Ipv4Addr::BROADCAST,
        p => Ipv4Addr::from(u32::MAX << (32 - p as u32)),
    }
}

/// Usable host addresses of the subnet, `network + 1 ..= broadcast - 1`.
///
/// Produced lazily. `/31` and `/32` have no usable range and yield nothing.
pub fn hosts(network_addr: Ipv4Addr, mask: Ipv4Addr) -> impl Iterator<Item = Ipv4Addr> {
    usable_range(network_addr, mask)
        .into_iter()
        .flat_map(Ipv4Range::to_iter)
}

/// First and last usable host of the subnet, if there are any.
pub fn usable_range(network_addr: Ipv4Addr, mask: Ipv4Addr) -> Option<Ipv4Range> {
    if netmask_prefix(mask) >= 31 {
        return None;
    }
    let net = u32::from(network(network_addr, mask));
    let bcast = u32::from(broadcast(network_addr, mask));
    Some(Ipv4Range::new(Ipv4Addr::from(net + 1), Ipv4Addr::from(bcast - 1)))
}

/// Addresses that may never enter the device registry: loopback, the
/// unspecified address and the limited broadcast.
pub fn is_reserved(ip: Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_unspecified() || ip.is_broadcast()
}

/// Immutable view of the interface the scan runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub local_ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub prefix_len: u8,
    pub network: Ipv4Addr,
    pub broadcast: Ipv4Addr,
}

impl NetworkInfo {
    pub fn new(local_ip: Ipv4Addr, netmask: Ipv4Addr) -> Self {
        Self {
            local_ip,
            netmask,
            prefix_len: netmask_prefix(netmask),
            network: network(local_ip, netmask),
            broadcast: broadcast(local_ip, netmask),
        }
    }

    /// Builds from `a.b.c.d/nn` notation, where the address is the local one.
    pub fn from_cidr(cidr: &str) -> Result<Self, ScanError> {
        let (ip, prefix) = cidr
            .split_once('/')
            .ok_or_else(|| ScanError::InvalidAddress(cidr.to_string()))?;
        let ip = parse(ip).ok_or_else(|| ScanError::InvalidAddress(cidr.to_string()))?;
        let prefix: u8 = prefix
            .parse()
            .ok()
            .filter(|p| *p <= 32)
            .ok_or_else(|| ScanError::InvalidAddress(cidr.to_string()))?;
        Ok(Self::new(ip, prefix_to_mask(prefix)))
    }

    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> + use<> {
        hosts(self.network, self.netmask)
    }

    pub fn host_count(&self) -> usize {
        usable_range(self.network, self.netmask).map_or(0, |range| range.len())
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        network(ip, self.netmask) == self.network
    }

    /// Snapshot-store key for this subnet.
    pub fn key(&self) -> String {
        format!("{}/{}", self.network, self.prefix_len)
    }
}

impl fmt::Display for NetworkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}/{}", self.local_ip, self.network, self.prefix_len)
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
