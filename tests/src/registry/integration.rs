use std::net::Ipv4Addr;
use std::sync::Arc;

use futures::future::join_all;
use lanwatch_common::device::{DiscoverySource, Observation, Port};
use lanwatch_common::policy::SourcePolicy;
use lanwatch_core::classifier::DeviceClassifier;
use lanwatch_core::registry::{self, DeviceMerger, RegistryEvent};
use lanwatch_core::vendors::StaticVendorLookup;

fn merger() -> DeviceMerger {
    DeviceMerger::new(
        SourcePolicy::default(),
        Arc::new(DeviceClassifier::default()),
        Arc::new(StaticVendorLookup::default()),
        None,
    )
}

/// Port merges are commutative, so concurrent writers agree on the result.
#[tokio::test]
async fn concurrent_observers_union_ports() {
    let (handle, _events, _task) = registry::spawn(merger());
    let ip = Ipv4Addr::new(172, 16, 0, 4);

    let writers = (1..=40u16).map(|port| {
        let handle = handle.clone();
        async move {
            handle
                .observe(
                    Observation::new(ip, DiscoverySource::Unknown)
                        .online()
                        .with_port(Port::open(port)),
                )
                .await
                .unwrap();
        }
    });
    join_all(writers).await;

    let device = handle.device(ip).await.unwrap().unwrap();
    assert_eq!(device.port_numbers(), (1..=40).collect::<Vec<u16>>());
}

#[tokio::test]
async fn inclusive_policy_lets_ssdp_claim() {
    let merger = DeviceMerger::new(
        SourcePolicy::inclusive(),
        Arc::new(DeviceClassifier::default()),
        Arc::new(StaticVendorLookup::default()),
        None,
    );
    let (handle, _events, _task) = registry::spawn(merger);
    let ip = Ipv4Addr::new(172, 16, 0, 8);

    for source in [DiscoverySource::WsDiscovery, DiscoverySource::Ssdp, DiscoverySource::Ping] {
        handle.observe(Observation::new(ip, source).online()).await.unwrap();
    }
    let device = handle.device(ip).await.unwrap().unwrap();
    assert_eq!(device.discovery_source, DiscoverySource::Ping);
}

#[tokio::test]
async fn every_update_is_announced() {
    let (handle, mut events, _task) = registry::spawn(merger());
    let ip = Ipv4Addr::new(172, 16, 0, 9);

    handle
        .observe(Observation::new(ip, DiscoverySource::Arp).online().with_mac("b8:27:eb:00:00:01"))
        .await
        .unwrap();
    handle
        .observe(Observation::new(ip, DiscoverySource::Ping).online().with_port(Port::open(22)))
        .await
        .unwrap();
    drop(handle);

    let mut updates = 0;
    let mut port_scans = 0;
    while let Some(event) = events.recv().await {
        match event {
            RegistryEvent::DeviceUpdated(device) => {
                assert_eq!(device.ip, ip);
                updates += 1;
            }
            RegistryEvent::PortScanWanted(_) => port_scans += 1,
            RegistryEvent::Barrier(token) => token.release(),
        }
    }
    assert_eq!(updates, 2);
    assert_eq!(port_scans, 1);
}
