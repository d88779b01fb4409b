use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use lanwatch_common::device::{DiscoverySource, Observation};
use lanwatch_protocols::ssdp;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{Discoverer, collect_responders, multicast_socket};

/// UPnP responders found through `M-SEARCH`.
pub struct SsdpDiscoverer {
    search_targets: Vec<String>,
    timeout: Duration,
}

impl SsdpDiscoverer {
    pub fn new(search_targets: Vec<String>, timeout: Duration) -> Self {
        Self {
            search_targets,
            timeout,
        }
    }
}

#[async_trait]
impl Discoverer for SsdpDiscoverer {
    fn source(&self) -> DiscoverySource {
        DiscoverySource::Ssdp
    }

    fn name(&self) -> &'static str {
        "ssdp"
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
        let socket = multicast_socket().await.context("binding SSDP socket")?;

        for target in &self.search_targets {
            let request = ssdp::m_search(target, ssdp::DEFAULT_MX);
            socket
                .send_to(request.as_bytes(), ssdp::SSDP_MULTICAST)
                .await
                .with_context(|| format!("sending M-SEARCH for {target}"))?;
        }

        let found = collect_responders(
            &socket,
            deadline,
            &cancel,
            &tx,
            DiscoverySource::Ssdp,
            |payload, sender| ssdp::responder(payload, sender).into_iter().collect(),
        )
        .await;

        tracing::debug!("ssdp: {found} responders");
        Ok(())
    }
}
