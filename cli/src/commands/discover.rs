use std::time::Duration;

use anyhow::Context;
use colored::*;
use lanwatch_common::device::Device;
use lanwatch_common::network::NetworkInfo;
use lanwatch_common::network::interface;
use lanwatch_common::{info, success, warn};
use lanwatch_core::orchestrator::{ScanDeps, ScanOrchestrator, ScanOutcome};

use crate::commands::DiscoverArgs;
use crate::mprint;
use crate::terminal::{colors, format, print, spinner};

pub async fn discover(args: DiscoverArgs, q_level: u8) -> anyhow::Result<()> {
    let network = match &args.network {
        Some(cidr) => NetworkInfo::from_cidr(cidr).with_context(|| format!("invalid network {cidr}"))?,
        None => interface::get_lan_network().context("could not find a LAN interface")?,
    };
    let config = args.to_config();
    info!("Using {network}");

    let orchestrator = ScanOrchestrator::new(config.clone(), ScanDeps::system(&config));
    let handle = orchestrator.start(network);

    let span = spinner::scan_span();
    let guard = span.enter();
    let follower = tokio::spawn(spinner::follow(span.clone(), handle.phases(), handle.progress()));

    let canceller = handle.canceller();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing early");
            canceller.cancel_scan();
        }
    });

    let outcome = handle.wait().await;
    ctrl_c.abort();
    let _ = follower.await;
    drop(guard);

    discovery_ends(&outcome?, q_level);
    Ok(())
}

fn discovery_ends(outcome: &ScanOutcome, q_level: u8) {
    let devices: Vec<&Device> = outcome.devices.iter().filter(|d| d.is_online).collect();
    if devices.is_empty() {
        print::header("zero hosts detected", q_level);
        print::no_results();
        return;
    }

    if q_level > 0 {
        mprint!();
    }

    print::header("network discovery", q_level);
    print_devices(&devices, q_level);
    print_summary(devices.len(), outcome.elapsed, outcome.cancelled, q_level);
}

fn print_devices(devices: &[&Device], q_level: u8) {
    for (idx, device) in devices.iter().enumerate() {
        match q_level {
            2.. => print::print(&format!(
                "{} {}",
                device.ip.to_string().color(colors::IPV4_ADDR),
                device.display_name()
            )),
            _ => {
                print::tree_head(idx, &device.display_name());
                print::as_tree_one_level(format::device_details(device));
                if idx + 1 != devices.len() {
                    mprint!();
                }
            }
        }
    }
}

fn print_summary(hosts_len: usize, total_time: Duration, cancelled: bool, q_level: u8) {
    let active_hosts: ColoredString = format!("{hosts_len} active hosts").bold().green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let verb = if cancelled { "Discovery Interrupted" } else { "Discovery Complete" };
    let output: String = format!("{verb}: {active_hosts} identified in {total_time}")
        .color(colors::TEXT_DEFAULT)
        .to_string();

    match q_level {
        0 => {
            print::fat_separator();
            print::centerln(&output);
        }
        _ => {
            mprint!();
            success!("{output}");
        }
    }
}
