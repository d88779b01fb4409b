//! Wire formats spoken (or scraped) during LAN discovery.
//!
//! Everything here is pure text/bytes handling; sockets and subprocesses live
//! in `lanwatch-core`.

pub mod arp;
pub mod endpoint;
pub mod mdns;
pub mod ping;
pub mod ssdp;
pub mod wsd;

/// Multicast group shared by SSDP and WS-Discovery.
pub const DISCOVERY_MULTICAST_GROUP: std::net::Ipv4Addr = std::net::Ipv4Addr::new(239, 255, 255, 250);
