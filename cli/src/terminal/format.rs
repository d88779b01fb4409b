//! Key/value rows for the device tree.

use colored::*;
use lanwatch_common::device::Device;

use crate::terminal::colors;

pub type Detail = (String, ColoredString);

pub fn device_details(device: &Device) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![("IPv4".to_string(), device.ip.to_string().color(colors::IPV4_ADDR))];

    if let Some(mac) = &device.mac {
        details.push(("MAC".to_string(), mac.color(colors::MAC_ADDR)));
    }

    if let Some(vendor) = &device.manufacturer {
        details.push(("Vendor".to_string(), vendor.color(colors::VENDOR)));
    }

    details.push(("Type".to_string(), type_with_confidence(device)));
    details.push(("Source".to_string(), device.discovery_source.to_string().normal()));

    if !device.open_ports.is_empty() {
        let ports = device
            .open_ports
            .iter()
            .map(|port| format!("{}/{}", port.number, port.service_name))
            .collect::<Vec<String>>()
            .join(", ");
        details.push(("Ports".to_string(), ports.color(colors::PORT)));
    }

    if !device.services.is_empty() {
        let services = device
            .services
            .iter()
            .map(|service| service.to_string())
            .collect::<Vec<String>>()
            .join(", ");
        details.push(("Services".to_string(), services.normal()));
    }

    if !device.is_online {
        details.push(("Status".to_string(), "offline".dimmed()));
    }

    details
}

pub fn type_with_confidence(device: &Device) -> ColoredString {
    let label = device.device_type.label();
    match device.confidence {
        Some(confidence) => format!("{label} ({:.0}%)", confidence * 100.0).bold(),
        None => label.bold(),
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
