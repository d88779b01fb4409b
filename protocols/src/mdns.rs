//! mDNS service-type helpers shared by the browser.

/// DNS-SD meta query that enumerates the service types present on the link.
pub const META_QUERY: &str = "_services._dns-sd._udp.local.";

/// Fully qualified form (`_http._tcp.local.`) of a service type.
pub fn normalize_service_type(service_type: &str) -> String {
    let trimmed = service_type.trim().trim_end_matches('.');
    let trimmed = trimmed.strip_suffix(".local").unwrap_or(trimmed);
    format!("{trimmed}.local.")
}

/// Whether `name` looks like a browsable `_service._proto` type.
pub fn is_service_type(name: &str) -> bool {
    let normalized = normalize_service_type(name);
    let mut labels = normalized.trim_end_matches(".local.").split('.');
    match (labels.next(), labels.next(), labels.next()) {
        (Some(service), Some(proto), None) => {
            service.starts_with('_') && service.len() > 1 && (proto == "_tcp" || proto == "_udp")
        }
        _ => false,
    }
}

/// Host name as advertised, without the trailing root dot.
pub fn clean_hostname(host: &str) -> Option<String> {
    let host = host.trim().trim_end_matches('.');
    (!host.is_empty()).then(|| host.to_string())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
