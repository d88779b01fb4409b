//! Command line and output handling for the system `ping` utility.

use std::net::Ipv4Addr;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

static RTT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)time\s*([=<])\s*([0-9]+(?:\.[0-9]+)?)\s*ms").expect("static rtt pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingFlavor {
    Linux,
    MacOs,
    Windows,
}

impl PingFlavor {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            PingFlavor::Windows
        } else if cfg!(any(target_os = "macos", target_os = "freebsd", target_os = "ios")) {
            PingFlavor::MacOs
        } else {
            PingFlavor::Linux
        }
    }

    /// Arguments for a single echo request bounded by `timeout`.
    pub fn args(self, host: Ipv4Addr, timeout: Duration) -> Vec<String> {
        let millis = timeout.as_millis().max(1);
        let mut args: Vec<String> = match self {
            PingFlavor::Linux => vec!["-c".into(), "1".into(), "-W".into(), timeout.as_secs().max(1).to_string()],
            PingFlavor::MacOs => vec!["-c".into(), "1".into(), "-W".into(), millis.to_string()],
            PingFlavor::Windows => vec!["-n".into(), "1".into(), "-w".into(), millis.to_string()],
        };
        args.push(host.to_string());
        args
    }
}

/// Round-trip time reported in `ping` output. `time<1ms` reads as 1.0.
pub fn parse_rtt(output: &str) -> Option<f64> {
    let caps = RTT.captures(output)?;
    caps[2].parse().ok()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
