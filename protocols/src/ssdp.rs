//! # SSDP
//!
//! `M-SEARCH` requests and the header scraping needed to pull a responder's
//! address out of the HTTP-over-UDP reply.

use std::net::{Ipv4Addr, SocketAddrV4};

use crate::{DISCOVERY_MULTICAST_GROUP, endpoint};

pub const SSDP_PORT: u16 = 1900;

pub const SSDP_MULTICAST: SocketAddrV4 = SocketAddrV4::new(DISCOVERY_MULTICAST_GROUP, SSDP_PORT);

pub const DEFAULT_MX: u8 = 3;

/// Builds one `M-SEARCH` request for `search_target`.
pub fn m_search(search_target: &str, mx: u8) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {SSDP_MULTICAST}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {mx}\r\n\
         ST: {search_target}\r\n\r\n"
    )
}

/// Value of `header` in an HTTP-style message, matched case-insensitively.
pub fn extract_header<'a>(response: &'a str, header: &str) -> Option<&'a str> {
    response.lines().skip(1).find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case(header)
            .then(|| value.trim())
    })
}

/// Whether the message is a search reply or an advertisement.
pub fn is_ssdp_message(response: &str) -> bool {
    let first = response.lines().next().unwrap_or_default();
    first.starts_with("HTTP/1.1 200") || first.starts_with("NOTIFY * HTTP/1.1")
}

/// IPv4 address a response points at, from its `LOCATION` header.
pub fn location_host(response: &str) -> Option<Ipv4Addr> {
    let location = extract_header(response, "LOCATION")?;
    endpoint::ipv4_host(location)
}

/// `LOCATION` host, or the sender when the response carries no IPv4
/// location.
pub fn responder(response: &str, sender: Ipv4Addr) -> Option<Ipv4Addr> {
    if !is_ssdp_message(response) {
        return None;
    }
    location_host(response).or(Some(sender))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
