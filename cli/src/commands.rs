pub mod classify;
pub mod discover;
pub mod info;

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use lanwatch_common::config::Config;

#[derive(Parser)]
#[command(name = "lanwatch")]
#[command(about = "Find and identify the devices on your local network.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Less output; repeat for even less
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// More log detail; repeat for trace output
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the LAN this device is on and the interfaces considered
    #[command(alias = "i")]
    Info,
    /// Discover and classify the hosts on the local network
    #[command(alias = "d")]
    Discover(DiscoverArgs),
    /// Run the device classifier against hand-written evidence
    #[command(alias = "c")]
    Classify(ClassifyArgs),
}

#[derive(Args, Debug, Default)]
pub struct DiscoverArgs {
    /// Scan this network instead of the detected one, e.g. 192.168.1.23/24
    #[arg(long, value_name = "ADDR/PREFIX")]
    pub network: Option<String>,

    #[arg(long)]
    pub no_mdns: bool,

    #[arg(long)]
    pub no_ssdp: bool,

    #[arg(long)]
    pub no_wsd: bool,

    /// Do not read the neighbor (ARP) table
    #[arg(long)]
    pub no_arp: bool,

    /// Skip the ICMP fallback sweep
    #[arg(long)]
    pub no_icmp: bool,

    /// Ports to check on every live host
    #[arg(short, long, value_delimiter = ',', value_name = "PORT,...")]
    pub ports: Option<Vec<u16>>,

    /// Load and save known devices in this JSON file
    #[arg(long, value_name = "PATH")]
    pub snapshot: Option<PathBuf>,
}

impl DiscoverArgs {
    pub fn to_config(&self) -> Config {
        let defaults = Config::default();
        Config {
            mdns: !self.no_mdns,
            ssdp: !self.no_ssdp,
            wsd: !self.no_wsd,
            arp: !self.no_arp,
            icmp: !self.no_icmp,
            scan_ports: self.ports.clone().unwrap_or(defaults.scan_ports.clone()),
            snapshot: self.snapshot.is_some(),
            snapshot_path: self.snapshot.clone(),
            ..defaults
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct ClassifyArgs {
    #[arg(long)]
    pub hostname: Option<String>,

    #[arg(long)]
    pub vendor: Option<String>,

    /// Open port; may be repeated
    #[arg(short, long = "port", value_name = "PORT")]
    pub ports: Vec<u16>,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
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

    fn parse(args: &[&str]) -> CommandLine {
        CommandLine::try_parse_from(args).unwrap()
    }

    #[test]
    fn discover_flags_map_onto_config() {
        let cli = parse(&[
            "lanwatch", "discover", "--no-mdns", "--no-icmp", "--ports", "22,8080", "--snapshot",
            "/tmp/lanwatch.json",
        ]);
        let Commands::Discover(args) = cli.command else {
            panic!("expected discover");
        };
        let config = args.to_config();

        assert!(!config.mdns);
        assert!(!config.icmp);
        assert!(config.ssdp && config.wsd && config.arp);
        assert_eq!(config.scan_ports, vec![22, 8080]);
        assert!(config.snapshot);
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/lanwatch.json")));
    }

    #[test]
    fn discover_defaults_keep_config_defaults() {
        let config = DiscoverArgs::default().to_config();
        let defaults = Config::default();
        assert_eq!(config.scan_ports, defaults.scan_ports);
        assert!(!config.snapshot);
    }

    #[test]
    fn quiet_is_global_and_counted() {
        let cli = parse(&["lanwatch", "info", "-qq"]);
        assert_eq!(cli.quiet, 2);
    }

    #[test]
    fn classify_takes_repeated_ports() {
        let cli = parse(&["lanwatch", "classify", "--hostname", "hp-printer", "-p", "631", "-p", "9100"]);
        let Commands::Classify(args) = cli.command else {
            panic!("expected classify");
        };
        assert_eq!(args.hostname.as_deref(), Some("hp-printer"));
        assert_eq!(args.ports, vec![631, 9100]);
    }
}
