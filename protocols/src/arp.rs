//! Parsing of the platform neighbor table (`arp -an` / `arp -a`).
//!
//! Accepted shapes:
//!
//! ```text
//! ? (192.168.1.1) at aa:bb:cc:dd:ee:ff on en0 ifscope [ethernet]   macOS / BSD
//! ? (192.168.1.1) at aa:bb:cc:dd:ee:ff [ether] on eth0              Linux net-tools
//!   192.168.1.1           aa-bb-cc-dd-ee-ff     dynamic              Windows
//! ```

use std::sync::LazyLock;

use lanwatch_common::device::ArpEntry;
use lanwatch_common::network::{address, mac};
use regex::Regex;

static UNIX_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\S+\s+\(([0-9.]+)\)\s+at\s+(\S+)(?:\s+\[\w+\])?\s+on\s+(\S+)")
        .expect("static neighbor pattern")
});

static WINDOWS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([0-9.]+)\s+([0-9A-Fa-f-]{17})\s+\w+").expect("static neighbor pattern")
});

static WINDOWS_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Interface:\s+([0-9.]+)").expect("static neighbor pattern")
});

/// Parses a whole neighbor-table dump. Lines that do not describe a complete,
/// valid entry are dropped.
pub fn parse_neighbor_table(output: &str) -> Vec<ArpEntry> {
    let mut entries = Vec::new();
    let mut windows_interface = String::new();

    for line in output.lines() {
        if let Some(caps) = WINDOWS_HEADER.captures(line) {
            windows_interface = caps[1].to_string();
            continue;
        }
        if let Some(entry) = parse_neighbor_line(line) {
            entries.push(entry);
            continue;
        }
        if let Some(caps) = WINDOWS_LINE.captures(line) {
            if let Some(entry) = build_entry(&caps[1], &caps[2], &windows_interface) {
                entries.push(entry);
            }
            continue;
        }
        if !line.trim().is_empty() {
            tracing::debug!("skipping neighbor line: {line}");
        }
    }

    entries
}

/// Parses one `name (ip) at mac on iface` line.
pub fn parse_neighbor_line(line: &str) -> Option<ArpEntry> {
    let caps = UNIX_LINE.captures(line)?;
    build_entry(&caps[1], &caps[2], &caps[3])
}

fn build_entry(ip: &str, raw_mac: &str, interface: &str) -> Option<ArpEntry> {
    let ip = address::parse(ip)?;
    if ip.is_multicast() || address::is_reserved(ip) {
        return None;
    }
    let mac = mac::normalize(&expand_short_octets(raw_mac))?;
    if mac == "ff:ff:ff:ff:ff:ff" {
        return None;
    }
    Some(ArpEntry {
        ip,
        mac,
        interface: interface.to_string(),
    })
}

/// BSD `arp` prints `0:1b:3:a:b:c`; pad every octet to two digits.
fn expand_short_octets(raw: &str) -> String {
    if !raw.contains(':') {
        return raw.to_string();
    }
    raw.split(':')
        .map(|octet| {
            if octet.len() == 1 {
                format!("0{octet}")
            } else {
                octet.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(":")
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
    use std::net::Ipv4Addr;

    #[test]
    fn parses_macos_line() {
        let entry =
            parse_neighbor_line("? (192.168.1.5) at AA:BB:CC:DD:EE:FF on en0 ifscope [ethernet]")
                .unwrap();
        assert_eq!(entry.ip, Ipv4Addr::new(192, 168, 1, 5));
        assert_eq!(entry.mac, "aa:bb:cc:dd:ee:ff");
        assert_eq!(entry.interface, "en0");
    }

    #[test]
    fn parses_linux_line() {
        let entry =
            parse_neighbor_line("gateway (192.168.1.1) at 00:11:22:33:44:55 [ether] on eth0")
                .unwrap();
        assert_eq!(entry.ip, Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(entry.interface, "eth0");
    }

    #[test]
    fn pads_bsd_short_octets() {
        let entry = parse_neighbor_line("? (10.0.0.2) at 0:1b:3:a:bc:d on en0 [ethernet]").unwrap();
        assert_eq!(entry.mac, "00:1b:03:0a:bc:0d");
    }

    #[test]
    fn drops_incomplete_and_invalid() {
        assert!(parse_neighbor_line("? (192.168.1.7) at (incomplete) on en0 ifscope [ethernet]").is_none());
        assert!(parse_neighbor_line("? (192.168.1.8) at <incomplete> on eth0").is_none());
        assert!(parse_neighbor_line("? (192.168.1.300) at aa:bb:cc:dd:ee:ff on en0").is_none());
        assert!(parse_neighbor_line("? (192.168.1.9) at aa:bb:cc:dd:ee on en0").is_none());
        assert!(parse_neighbor_line("garbage").is_none());
    }

    #[test]
    fn drops_broadcast_and_multicast_rows() {
        assert!(parse_neighbor_line("? (192.168.1.255) at ff:ff:ff:ff:ff:ff on en0 ifscope [ethernet]").is_none());
        assert!(parse_neighbor_line("? (224.0.0.251) at 1:0:5e:0:0:fb on en0 ifscope permanent [ethernet]").is_none());
    }

    #[test]
    fn parses_whole_table() {
        let output = "\
? (192.168.1.1) at 0:11:22:33:44:55 on en0 ifscope [ethernet]
? (192.168.1.7) at (incomplete) on en0 ifscope [ethernet]
? (192.168.1.20) at a4:83:e7:12:34:56 on en0 ifscope [ethernet]
";
        let entries = parse_neighbor_table(output);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].ip, Ipv4Addr::new(192, 168, 1, 20));
    }

    #[test]
    fn parses_windows_table() {
        let output = "
Interface: 192.168.1.42 --- 0xb
  Internet Address      Physical Address      Type
  192.168.1.1           00-11-22-33-44-55     dynamic
  192.168.1.255         ff-ff-ff-ff-ff-ff     static
";
        let entries = parse_neighbor_table(output);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mac, "00:11:22:33:44:55");
        assert_eq!(entries[0].interface, "192.168.1.42");
    }
}
