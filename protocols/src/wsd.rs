//! # WS-Discovery
//!
//! SOAP 1.2 `Probe` envelope and `ProbeMatch` scraping. Replies are not
//! parsed as XML; only the `XAddrs` element is of interest and it is pulled
//! out with a namespace-agnostic pattern.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use crate::{DISCOVERY_MULTICAST_GROUP, endpoint};

pub const WSD_PORT: u16 = 3702;

pub const WSD_MULTICAST: SocketAddrV4 = SocketAddrV4::new(DISCOVERY_MULTICAST_GROUP, WSD_PORT);

static XADDRS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(?:[\w.-]+:)?XAddrs(?:\s[^>]*)?>(.*?)</(?:[\w.-]+:)?XAddrs\s*>")
        .expect("static XAddrs pattern")
});

/// Probe envelope with the given `MessageID`.
pub fn probe_message(message_id: Uuid) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope" xmlns:wsa="http://schemas.xmlsoap.org/ws/2004/08/addressing" xmlns:wsd="http://schemas.xmlsoap.org/ws/2005/04/discovery">
  <soap:Header>
    <wsa:To>urn:schemas-xmlsoap-org:ws:2005:04:discovery</wsa:To>
    <wsa:Action>http://schemas.xmlsoap.org/ws/2005/04/discovery/Probe</wsa:Action>
    <wsa:MessageID>urn:uuid:{message_id}</wsa:MessageID>
  </soap:Header>
  <soap:Body>
    <wsd:Probe/>
  </soap:Body>
</soap:Envelope>"#
    )
}

/// Fresh probe, returning the message id alongside the envelope.
pub fn new_probe() -> (Uuid, String) {
    let id = Uuid::new_v4();
    (id, probe_message(id))
}

pub fn is_probe_match(response: &str) -> bool {
    response.contains("ProbeMatch")
}

/// Every URL listed in the reply's `XAddrs` elements.
pub fn extract_xaddrs(response: &str) -> Vec<String> {
    XADDRS
        .captures_iter(response)
        .filter_map(|caps| caps.get(1))
        .flat_map(|list| list.as_str().split_whitespace())
        .map(str::to_string)
        .collect()
}

/// Distinct IPv4 hosts advertised in a `ProbeMatch`, in order of appearance.
pub fn xaddr_hosts(response: &str) -> Vec<Ipv4Addr> {
    let mut hosts = Vec::new();
    for url in extract_xaddrs(response) {
        match endpoint::ipv4_host(&url) {
            Some(ip) if !hosts.contains(&ip) => hosts.push(ip),
            Some(_) => {}
            None => tracing::debug!("ignoring XAddr {url}"),
        }
    }
    hosts
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
