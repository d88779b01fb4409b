use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use lanwatch_common::config::Config;
use lanwatch_common::device::{ArpEntry, DeviceType, DiscoverySource, Observation, Service};
use lanwatch_common::network::NetworkInfo;
use lanwatch_common::scan::{ScanPhase, ScanProgress};
use lanwatch_common::services::ServiceKind;
use lanwatch_core::orchestrator::ScanOrchestrator;
use lanwatch_core::ports::{PortProber, TcpPortScanner};
use lanwatch_integration_tests::support::{FakePortProber, FakeProber, ScriptedDiscoverer, deps};
use tokio_util::sync::CancellationToken;

fn quiet_config() -> Config {
    Config {
        icmp: false,
        ..Config::default()
    }
}

/// A /30 has two usable hosts; the local one is skipped but still counted.
#[tokio::test]
async fn slash_30_with_one_live_peer() {
    let network = NetworkInfo::from_cidr("192.168.1.1/30").unwrap();
    let peer = Ipv4Addr::new(192, 168, 1, 2);
    let prober = FakeProber::alive(&[peer]);

    let orchestrator = ScanOrchestrator::new(quiet_config(), deps(prober, Arc::new(FakePortProber::default())));
    let outcome = orchestrator.scan(network).await.unwrap();

    assert!(!outcome.cancelled);
    assert_eq!(outcome.devices.len(), 1);
    assert_eq!(outcome.devices[0].ip, peer);
    assert!(outcome.devices[0].is_online);
    assert_eq!(outcome.progress, ScanProgress { scanned: 2, total: 2 });
}

#[tokio::test]
async fn neighbor_entry_enriched_by_mdns() {
    let ip = Ipv4Addr::new(192, 168, 1, 5);
    let arp = ArpEntry {
        ip,
        mac: "aa:bb:cc:dd:ee:ff".to_string(),
        interface: "en0".to_string(),
    };
    let mdns = Observation::new(ip, DiscoverySource::Mdns)
        .online()
        .with_hostname("nas.local.")
        .with_service(Service::new(ServiceKind::Http, Some(80)));

    let mut deps = deps(FakeProber::default(), Arc::new(FakePortProber::default()));
    deps.discoverers = vec![
        Arc::new(ScriptedDiscoverer::new(DiscoverySource::Arp, vec![Observation::from(arp)])),
        Arc::new(ScriptedDiscoverer {
            delay: Duration::from_millis(20),
            ..ScriptedDiscoverer::new(DiscoverySource::Mdns, vec![mdns])
        }),
    ];

    let network = NetworkInfo::from_cidr("192.168.1.10/24").unwrap();
    let outcome = ScanOrchestrator::new(quiet_config(), deps).scan(network).await.unwrap();

    assert_eq!(outcome.devices.len(), 1);
    let device = &outcome.devices[0];
    assert_eq!(device.discovery_source, DiscoverySource::Mdns);
    assert_eq!(device.hostname.as_deref(), Some("nas.local"));
    assert!(device.has_service(ServiceKind::Http));
    assert_eq!(device.mac.as_deref(), Some("aa:bb:cc:dd:ee:ff"));
    assert_eq!(device.manufacturer.as_deref(), Some("Synology Incorporated"));
    assert_eq!(device.device_type, DeviceType::Nas);
}

#[tokio::test]
async fn devices_come_back_sorted_with_ports() {
    let ips = [
        Ipv4Addr::new(10, 0, 0, 100),
        Ipv4Addr::new(10, 0, 0, 9),
        Ipv4Addr::new(10, 0, 0, 20),
    ];
    let ports = Arc::new(FakePortProber::with([(ips[0], vec![53, 67]), (ips[1], vec![631])]));
    let orchestrator = ScanOrchestrator::new(quiet_config(), deps(FakeProber::alive(&ips), ports.clone()));

    let outcome = orchestrator
        .scan(NetworkInfo::from_cidr("10.0.0.1/24").unwrap())
        .await
        .unwrap();

    let order: Vec<Ipv4Addr> = outcome.devices.iter().map(|d| d.ip).collect();
    assert_eq!(
        order,
        vec![
            Ipv4Addr::new(10, 0, 0, 9),
            Ipv4Addr::new(10, 0, 0, 20),
            Ipv4Addr::new(10, 0, 0, 100)
        ]
    );
    assert_eq!(outcome.devices[0].device_type, DeviceType::Printer);
    assert_eq!(outcome.devices[2].device_type, DeviceType::Router);
    assert_eq!(ports.scans.load(Ordering::Relaxed), 3);
}

#[tokio::test]
async fn cancelling_mid_discovery() {
    let mut deps = deps(FakeProber::default(), Arc::new(FakePortProber::default()));
    deps.discoverers = vec![Arc::new(ScriptedDiscoverer {
        delay: Duration::from_secs(60),
        ..ScriptedDiscoverer::new(DiscoverySource::Mdns, Vec::new())
    })];
    let orchestrator = ScanOrchestrator::new(quiet_config(), deps);

    let handle = orchestrator.start(NetworkInfo::from_cidr("10.0.0.1/24").unwrap());
    let mut phases = handle.phases();
    phases.wait_for(|phase| *phase == ScanPhase::Discovery).await.unwrap();
    handle.cancel_scan();

    let outcome = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.cancelled);
    assert_eq!(*phases.borrow(), ScanPhase::Cancelled);
}

#[tokio::test]
async fn port_scanner_against_loopback_listener() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        loop {
            let _ = listener.accept().await;
        }
    });

    let scanner = TcpPortScanner::new(vec![open], 4, Duration::from_millis(500));
    let ports = scanner
        .scan(Ipv4Addr::LOCALHOST, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(ports.len(), 1);
    assert_eq!(ports[0].number, open);
}

#[tokio::test]
#[ignore = "scans the real LAN"]
async fn discover_real_lan() {
    let network = lanwatch_common::network::interface::get_lan_network().unwrap();
    let config = Config::default();
    let orchestrator = ScanOrchestrator::new(
        config.clone(),
        lanwatch_core::orchestrator::ScanDeps::system(&config),
    );
    let outcome = orchestrator.scan(network).await.unwrap();
    assert!(!outcome.cancelled);
}
