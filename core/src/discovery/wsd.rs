use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use lanwatch_common::device::{DiscoverySource, Observation};
use lanwatch_protocols::wsd;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{Discoverer, collect_responders, multicast_socket};

/// Devices answering a WS-Discovery `Probe` (printers, cameras, Windows hosts).
pub struct WsDiscoverer {
    timeout: Duration,
}

impl WsDiscoverer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Discoverer for WsDiscoverer {
    fn source(&self) -> DiscoverySource {
        DiscoverySource::WsDiscovery
    }

    fn name(&self) -> &'static str {
        "ws-discovery"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn discover(
        &self,
        tx: mpsc::Sender<Observation>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        let deadline = Instant::now() + self.timeout;
        let socket = multicast_socket().await.context("binding WS-Discovery socket")?;

        let (message_id, probe) = wsd::new_probe();
        socket
            .send_to(probe.as_bytes(), wsd::WSD_MULTICAST)
            .await
            .context("sending WS-Discovery probe")?;
        tracing::debug!("ws-discovery probe {message_id} sent");

        let found = collect_responders(
            &socket,
            deadline,
            &cancel,
            &tx,
            DiscoverySource::WsDiscovery,
            |payload, _sender| {
                if wsd::is_probe_match(payload) {
                    wsd::xaddr_hosts(payload)
                } else {
                    Vec::new()
                }
            },
        )
        .await;

        tracing::debug!("ws-discovery: {found} responders");
        Ok(())
    }
}
