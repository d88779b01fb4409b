//! # Interface selection
//!
//! Picks the interface the LAN scan runs on. Candidates must be up, physical,
//! broadcast capable, carry a MAC and a private IPv4 address. Wired links win
//! over wireless ones when several qualify.

use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::IpNetwork;

#[cfg(target_os = "linux")]
use linux_impl::{is_physical, is_wireless};
#[cfg(target_os = "macos")]
use macos_impl::{is_physical, is_wireless};
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
use fallback_impl::{is_physical, is_wireless};

use crate::error::ScanError;
use crate::network::address::NetworkInfo;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ViabilityError {
    /// The interface is operationally down.
    IsDown,
    /// The interface was filtered out as "not physical".
    NotPhysical,
    /// The interface does not have a MAC address.
    NoMacAddress,
    /// The interface does not support broadcast.
    NotBroadcast,
    /// The interface is a point-to-point link (e.g., a VPN).
    IsPointToPoint,
    /// The interface has no private IPv4 address.
    NoValidLanIp,
}

/// Summary of one interface, for `lanwatch info`.
#[derive(Debug, Clone)]
pub struct InterfaceSummary {
    pub name: String,
    pub mac: Option<String>,
    pub network: Option<NetworkInfo>,
    pub wired: bool,
    pub viability: Result<(), ViabilityError>,
}

/// Resolves the [`NetworkInfo`] of the primary LAN interface.
pub fn get_lan_network() -> anyhow::Result<NetworkInfo> {
    let interfaces: Vec<NetworkInterface> = pnet::datalink::interfaces()
        .into_iter()
        .filter(|interface| is_viable_lan_interface(interface, is_physical).is_ok())
        .collect();

    let interface = select_best_lan_interface(interfaces, is_wired).ok_or(ScanError::NoInterface)?;

    let info = lan_network_of(&interface).ok_or(ScanError::NoInterface)?;
    Ok(info)
}

/// Every non-loopback interface with its viability verdict.
pub fn candidate_interfaces() -> Vec<InterfaceSummary> {
    pnet::datalink::interfaces()
        .into_iter()
        .filter(|interface| !interface.is_loopback())
        .map(|interface| InterfaceSummary {
            name: interface.name.clone(),
            mac: interface.mac.map(|mac| mac.to_string()),
            network: lan_network_of(&interface),
            wired: is_wired(&interface),
            viability: is_viable_lan_interface(&interface, is_physical),
        })
        .collect()
}

/// First private IPv4 network configured on the interface.
pub fn lan_network_of(interface: &NetworkInterface) -> Option<NetworkInfo> {
    interface.ips.iter().find_map(|net| match net {
        IpNetwork::V4(v4) if v4.ip().is_private() => Some(NetworkInfo::new(v4.ip(), v4.mask())),
        _ => None,
    })
}

fn is_viable_lan_interface(
    interface: &NetworkInterface,
    is_physical: impl Fn(&NetworkInterface) -> bool,
) -> Result<(), ViabilityError> {
    if !interface.is_up() {
        return Err(ViabilityError::IsDown);
    }
    if interface.is_loopback() || !is_physical(interface) {
        return Err(ViabilityError::NotPhysical);
    }
    if interface.mac.is_none() {
        return Err(ViabilityError::NoMacAddress);
    }
    if !interface.is_broadcast() {
        return Err(ViabilityError::NotBroadcast);
    }
    if interface.is_point_to_point() {
        return Err(ViabilityError::IsPointToPoint);
    }
    let has_valid_ip = interface.ips.iter().any(|net| match net {
        IpNetwork::V4(ipv4) => ipv4.ip().is_private(),
        IpNetwork::V6(_) => false,
    });
    if !has_valid_ip {
        return Err(ViabilityError::NoValidLanIp);
    }

    Ok(())
}

fn select_best_lan_interface(
    interfaces: Vec<NetworkInterface>,
    is_wired: impl Fn(&NetworkInterface) -> bool,
) -> Option<NetworkInterface> {
    let wired = interfaces.iter().position(|interface| is_wired(interface));
    let index = wired.unwrap_or(0);
    interfaces.into_iter().nth(index)
}

fn is_wired(interface: &NetworkInterface) -> bool {
    is_physical(interface) && !is_wireless(interface)
}

#[cfg(target_os = "linux")]
mod linux_impl {
    use super::*;
    use std::path::Path;

    pub fn is_physical(interface: &NetworkInterface) -> bool {
        Path::new(&format!("/sys/class/net/{}/device", interface.name)).exists()
    }

    pub fn is_wireless(interface: &NetworkInterface) -> bool {
        Path::new(&format!("/sys/class/net/{}/wireless", interface.name)).exists()
    }
}

#[cfg(target_os = "macos")]
mod macos_impl {
    use super::*;
    use std::collections::HashSet;
    use std::process::Command;
    use std::sync::OnceLock;

    struct HardwareInfo {
        physical_devices: HashSet<String>,
        wireless_devices: HashSet<String>,
    }

    /// Runs `networksetup` once and caches which ports are hardware / Wi-Fi.
    fn get_hardware_info() -> &'static HardwareInfo {
        static HARDWARE_INFO: OnceLock<HardwareInfo> = OnceLock::new();

        HARDWARE_INFO.get_or_init(|| {
            let mut physical = HashSet::new();
            let mut wireless = HashSet::new();

            if let Ok(output) = Command::new("networksetup").arg("-listallhardwareports").output() {
                let stdout = String::from_utf8_lossy(&output.stdout);
                for line in stdout.lines() {
                    if let Some(device) = line.strip_prefix("Device: ") {
                        physical.insert(device.trim().to_string());
                    }
                }
            }

            for device in &physical {
                let is_wifi = Command::new("networksetup")
                    .arg("-getairportnetwork")
                    .arg(device)
                    .output()
                    .map(|out| out.status.success())
                    .unwrap_or(false);

                if is_wifi {
                    wireless.insert(device.clone());
                }
            }

            HardwareInfo {
                physical_devices: physical,
                wireless_devices: wireless,
            }
        })
    }

    pub fn is_physical(interface: &NetworkInterface) -> bool {
        get_hardware_info().physical_devices.contains(&interface.name)
    }

    pub fn is_wireless(interface: &NetworkInterface) -> bool {
        get_hardware_info().wireless_devices.contains(&interface.name)
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
mod fallback_impl {
    use super::*;

    pub fn is_physical(interface: &NetworkInterface) -> bool {
        interface.mac.is_some()
    }

    pub fn is_wireless(interface: &NetworkInterface) -> bool {
        let name = interface.name.to_ascii_lowercase();
        name.contains("wi-fi") || name.contains("wlan") || name.contains("wireless")
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
    use pnet::util::MacAddr;
    use std::net::Ipv4Addr;

    const IFF_UP: u32 = 1;
    const IFF_BROADCAST: u32 = 1 << 1;
    const IFF_LOOPBACK: u32 = 1 << 3;
    const IFF_POINTTOPOINT: u32 = 1 << 4;

    fn create_mock_interface(
        name: &str,
        mac: Option<MacAddr>,
        ips: Vec<IpNetwork>,
        flags: u32,
    ) -> NetworkInterface {
        NetworkInterface {
            name: name.to_string(),
            description: "An interface".to_string(),
            index: 0,
            mac,
            ips,
            flags,
        }
    }

    fn default_mac() -> Option<MacAddr> {
        Some(MacAddr(0x1, 0x2, 0x3, 0x4, 0x5, 0x6))
    }

    fn default_ips() -> Vec<IpNetwork> {
        vec![IpNetwork::V4("192.168.1.100/24".parse().unwrap())]
    }

    fn physical(_: &NetworkInterface) -> bool {
        true
    }

    #[test]
    fn is_viable_lan_interface_should_succeed() {
        let interface =
            create_mock_interface("eth0", default_mac(), default_ips(), IFF_UP | IFF_BROADCAST);
        assert_eq!(is_viable_lan_interface(&interface, physical), Ok(()));
    }

    #[test]
    fn is_viable_lan_interface_should_fail_with_only_ipv6() {
        let ipv6_ips = vec![IpNetwork::V6("fe80::1234:5678:abcd:ef01".parse().unwrap())];
        let interface =
            create_mock_interface("eth0", default_mac(), ipv6_ips, IFF_UP | IFF_BROADCAST);
        assert_eq!(
            is_viable_lan_interface(&interface, physical),
            Err(ViabilityError::NoValidLanIp)
        );
    }

    #[test]
    fn is_viable_lan_interface_should_fail_with_public_ipv4() {
        let ips = vec![IpNetwork::V4("8.8.4.4/24".parse().unwrap())];
        let interface = create_mock_interface("eth0", default_mac(), ips, IFF_UP | IFF_BROADCAST);
        assert_eq!(
            is_viable_lan_interface(&interface, physical),
            Err(ViabilityError::NoValidLanIp)
        );
    }

    #[test]
    fn is_viable_lan_interface_should_fail_non_physical() {
        let interface =
            create_mock_interface("eth1", default_mac(), default_ips(), IFF_UP | IFF_BROADCAST);
        let result = is_viable_lan_interface(&interface, |_| false);
        assert_eq!(result, Err(ViabilityError::NotPhysical))
    }

    #[test]
    fn is_viable_lan_interface_should_fail_no_mac_addr() {
        let interface = create_mock_interface("eth0", None, default_ips(), IFF_UP | IFF_BROADCAST);
        assert_eq!(
            is_viable_lan_interface(&interface, physical),
            Err(ViabilityError::NoMacAddress)
        )
    }

    #[test]
    fn is_viable_lan_interface_should_fail_when_down() {
        let interface =
            create_mock_interface("wlan0", default_mac(), default_ips(), IFF_BROADCAST);
        assert_eq!(is_viable_lan_interface(&interface, physical), Err(ViabilityError::IsDown))
    }

    #[test]
    fn is_viable_lan_interface_should_fail_loop_back() {
        let interface = create_mock_interface(
            "lo",
            default_mac(),
            default_ips(),
            IFF_LOOPBACK | IFF_UP | IFF_BROADCAST,
        );
        assert_eq!(
            is_viable_lan_interface(&interface, physical),
            Err(ViabilityError::NotPhysical)
        )
    }

    #[test]
    fn is_viable_lan_interface_should_fail_not_broadcast() {
        let interface = create_mock_interface("eth0", default_mac(), default_ips(), IFF_UP);
        assert_eq!(
            is_viable_lan_interface(&interface, physical),
            Err(ViabilityError::NotBroadcast)
        );
    }

    #[test]
    fn is_viable_lan_interface_should_fail_point_to_point() {
        let interface = create_mock_interface(
            "tun0",
            default_mac(),
            default_ips(),
            IFF_BROADCAST | IFF_POINTTOPOINT | IFF_UP,
        );
        assert_eq!(
            is_viable_lan_interface(&interface, physical),
            Err(ViabilityError::IsPointToPoint)
        )
    }

    #[test]
    fn select_best_lan_interface_selects_first_interface() {
        let interface =
            create_mock_interface("wlan0", default_mac(), default_ips(), IFF_UP | IFF_BROADCAST);
        let result = select_best_lan_interface(vec![interface], |i| i.name == "eth0");
        assert_eq!(result.unwrap().name, "wlan0");
    }

    #[test]
    fn select_best_lan_interface_selects_wired_over_wireless() {
        let wired =
            create_mock_interface("eth0", default_mac(), default_ips(), IFF_UP | IFF_BROADCAST);
        let wireless =
            create_mock_interface("wlan0", default_mac(), default_ips(), IFF_UP | IFF_BROADCAST);
        let result = select_best_lan_interface(vec![wireless, wired], |i| i.name == "eth0");
        assert_eq!(result.unwrap().name, "eth0");
    }

    #[test]
    fn select_best_lan_interface_returns_none() {
        assert!(select_best_lan_interface(vec![], |i| i.name == "eth0").is_none());
    }

    #[test]
    fn lan_network_of_uses_private_ipv4() {
        let ips = vec![
            IpNetwork::V6("fe80::1/64".parse().unwrap()),
            IpNetwork::V4("192.168.7.20/24".parse().unwrap()),
        ];
        let interface = create_mock_interface("eth0", default_mac(), ips, IFF_UP | IFF_BROADCAST);
        let info = lan_network_of(&interface).unwrap();
        assert_eq!(info.local_ip, Ipv4Addr::new(192, 168, 7, 20));
        assert_eq!(info.key(), "192.168.7.0/24");
    }

    #[test]
    #[ignore]
    fn resolves_lan_network_on_this_host() {
        let info = get_lan_network().unwrap();
        assert!(info.local_ip.is_private());
    }
}
