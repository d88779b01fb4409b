use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;
use url::{Host, Url};

static SCOPE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(://[^/%\s\[]*|://\[[^\]%]*)%[^:/\]\s]*").expect("static scope pattern")
});

/// Removes an interface scope (`%en0`, `%25eth0`) from the host part of a URL.
pub fn strip_scope(url: &str) -> String {
    SCOPE_SUFFIX.replace(url, "$1").into_owned()
}

/// IPv4 host of an advertised endpoint URL, if it has one.
pub fn ipv4_host(url: &str) -> Option<Ipv4Addr> {
    let url = Url::parse(&strip_scope(url.trim())).ok()?;
    match url.host()? {
        Host::Ipv4(ip) => Some(ip),
        Host::Domain(domain) => lanwatch_common::network::address::parse(domain),
        Host::Ipv6(_) => None,
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
