use colored::*;
use lanwatch_common::network::NetworkInfo;
use lanwatch_common::network::interface::{self, InterfaceSummary};
use lanwatch_common::warn;

use crate::mprint;
use crate::terminal::{colors, format::Detail, print};

pub fn info(q_level: u8) -> anyhow::Result<()> {
    match interface::get_lan_network() {
        Ok(network) => {
            print::tree_head(0, "Selected LAN");
            print::as_tree_one_level(network_details(&network));
        }
        Err(e) => warn!("No usable LAN interface: {e}"),
    }

    if q_level > 0 {
        return Ok(());
    }

    mprint!();
    print::header("interfaces", q_level);
    let interfaces = interface::candidate_interfaces();
    for (idx, summary) in interfaces.iter().enumerate() {
        print::tree_head(idx, &summary.name);
        print::as_tree_one_level(interface_details(summary));
        if idx + 1 != interfaces.len() {
            mprint!();
        }
    }
    Ok(())
}

fn network_details(network: &NetworkInfo) -> Vec<Detail> {
    vec![
        ("Local".to_string(), network.local_ip.to_string().color(colors::IPV4_ADDR)),
        (
            "Network".to_string(),
            format!(
                "{}/{}",
                network.network.to_string().color(colors::IPV4_ADDR),
                network.prefix_len.to_string().color(colors::IPV4_PREFIX)
            )
            .normal(),
        ),
        ("Netmask".to_string(), network.netmask.to_string().normal()),
        ("Broadcast".to_string(), network.broadcast.to_string().normal()),
        ("Hosts".to_string(), network.host_count().to_string().normal()),
    ]
}

fn interface_details(summary: &InterfaceSummary) -> Vec<Detail> {
    let mut details: Vec<Detail> = Vec::new();

    if let Some(network) = &summary.network {
        details.push((
            "IPv4".to_string(),
            format!("{}/{}", network.local_ip, network.prefix_len).color(colors::IPV4_ADDR),
        ));
    }
    if let Some(mac) = &summary.mac {
        details.push(("MAC".to_string(), mac.color(colors::MAC_ADDR)));
    }
    details.push((
        "Medium".to_string(),
        if summary.wired { "wired" } else { "wireless" }.normal(),
    ));

    let verdict = match summary.viability {
        Ok(()) => "usable".green(),
        Err(reason) => format!("{reason:?}").dimmed(),
    };
    details.push(("Status".to_string(), verdict));
    details
}
