use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use lanwatch_common::config::Config;
use lanwatch_common::device::{DiscoverySource, Observation};
use lanwatch_common::network::NetworkInfo;
use lanwatch_common::snapshot::SnapshotStore;
use lanwatch_core::orchestrator::ScanOrchestrator;
use lanwatch_core::store::JsonFileStore;
use lanwatch_integration_tests::support::{FakePortProber, FakeProber, ScriptedDiscoverer, deps};

/// Devices seen in one run show up, offline, in the next one.
#[tokio::test]
async fn json_snapshot_survives_restart() {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let path = std::env::temp_dir().join(format!("lanwatch-it-{nanos}.json"));
    let network = NetworkInfo::from_cidr("192.168.50.1/29").unwrap();
    let nas = Ipv4Addr::new(192, 168, 50, 3);

    let config = Config {
        icmp: false,
        snapshot: true,
        snapshot_path: Some(path.clone()),
        ..Config::default()
    };

    let mut first = deps(FakeProber::default(), Arc::new(FakePortProber::default()));
    first.store = Some(Arc::new(JsonFileStore::new(&path)));
    first.discoverers = vec![Arc::new(ScriptedDiscoverer::new(
        DiscoverySource::Mdns,
        vec![Observation::new(nas, DiscoverySource::Mdns).online().with_hostname("diskstation")],
    ))];
    let outcome = ScanOrchestrator::new(config.clone(), first)
        .scan(network.clone())
        .await
        .unwrap();
    assert_eq!(outcome.devices.len(), 1);

    let stored = JsonFileStore::new(&path).load(&network.key()).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].hostname.as_deref(), Some("diskstation"));

    let mut second = deps(FakeProber::default(), Arc::new(FakePortProber::default()));
    second.store = Some(Arc::new(JsonFileStore::new(&path)));
    let outcome = ScanOrchestrator::new(config, second)
        .scan(network)
        .await
        .unwrap();

    assert_eq!(outcome.devices.len(), 1);
    let device = &outcome.devices[0];
    assert_eq!(device.ip, nas);
    assert!(!device.is_online);
    assert_eq!(device.hostname.as_deref(), Some("diskstation"));

    let _ = std::fs::remove_file(path);
}
