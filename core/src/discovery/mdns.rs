//! Multicast DNS service browsing.
//!
//! Service types are either enumerated live through the DNS-SD meta query or
//! taken from the configured seed list. Every type is browsed in parallel
//! until the shared deadline, and each resolved instance becomes one
//! observation carrying the advertised host name and, when the type is in the
//! service catalog, a [`Service`].

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures::future;
use lanwatch_common::config::Config;
use lanwatch_common::device::{DiscoverySource, Observation, Service};
use lanwatch_common::services::ServiceKind;
use lanwatch_protocols::mdns::{self as mdns_wire, META_QUERY};
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout};
use tokio_util::sync::CancellationToken;

use super::{Discoverer, emit};

pub struct MdnsDiscoverer {
    service_types: Vec<String>,
    meta_query: bool,
    meta_timeout: Duration,
    timeout: Duration,
}

impl MdnsDiscoverer {
    pub fn new(service_types: Vec<String>, timeout: Duration) -> Self {
        Self {
            service_types,
            meta_query: false,
            meta_timeout: Duration::ZERO,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            service_types: config.mdns_service_types.clone(),
            meta_query: config.mdns_meta_query,
            meta_timeout: config.mdns_meta_timeout.min(config.mdns_timeout),
            timeout: config.mdns_timeout,
        }
    }

    /// Service types announced on the link, via the DNS-SD meta query.
    async fn enumerate_types(
        &self,
        daemon: &ServiceDaemon,
        cancel: &CancellationToken,
    ) -> Vec<String> {
        let receiver = match daemon.browse(META_QUERY) {
            Ok(receiver) => receiver,
            Err(err) => {
                tracing::debug!("mdns meta query failed: {err}");
                return Vec::new();
            }
        };

        let deadline = Instant::now() + self.meta_timeout;
        let mut types: Vec<String> = Vec::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || cancel.is_cancelled() {
                break;
            }
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = timeout(remaining, receiver.recv_async()) => event,
            };
            match event {
                Ok(Ok(ServiceEvent::ServiceFound(_, fullname))) => {
                    if mdns_wire::is_service_type(&fullname) {
                        let normalized = mdns_wire::normalize_service_type(&fullname);
                        if !types.contains(&normalized) {
                            types.push(normalized);
                        }
                    }
                }
                Ok(Ok(_)) => continue,
                Ok(Err(_)) | Err(_) => break,
            }
        }

        let _ = daemon.stop_browse(META_QUERY);
        types
    }

    /// Browses one service type until `deadline`, emitting resolved
    /// instances. Returns how many observations went out.
    async fn browse_type(
        &self,
        daemon: &ServiceDaemon,
        service_type: &str,
        deadline: Instant,
        tx: &mpsc::Sender<Observation>,
        cancel: &CancellationToken,
    ) -> usize {
        let mut emitted = 0;

        let receiver = match daemon.browse(service_type) {
            Ok(receiver) => receiver,
            Err(err) => {
                tracing::debug!("mdns browse {service_type} failed: {err}");
                return emitted;
            }
        };

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = timeout(remaining, receiver.recv_async()) => event,
            };
            let info = match event {
                Ok(Ok(ServiceEvent::ServiceResolved(info))) => info,
                Ok(Ok(_)) => continue,
                Ok(Err(_)) | Err(_) => break,
            };

            for observation in observations_for(service_type, &info) {
                if !emit(tx, observation).await {
                    let _ = daemon.stop_browse(service_type);
                    return emitted;
                }
                emitted += 1;
            }
        }

        let _ = daemon.stop_browse(service_type);
        emitted
    }
}

/// One observation per IPv4 address of a resolved instance.
fn observations_for(service_type: &str, info: &ServiceInfo) -> Vec<Observation> {
    let hostname = mdns_wire::clean_hostname(info.get_hostname());
    let service = service_for(service_type, info);

    ipv4_addresses(info)
        .into_iter()
        .map(|ip| {
            let observation = Observation::new(ip, DiscoverySource::Mdns)
                .online()
                .with_services(service.clone());
            match &hostname {
                Some(hostname) => observation.with_hostname(hostname.clone()),
                None => observation,
            }
        })
        .collect()
}

fn service_for(service_type: &str, info: &ServiceInfo) -> Option<Service> {
    let kind = ServiceKind::from_mdns_type(service_type)?;
    let port = match info.get_port() {
        0 => None,
        port => Some(port),
    };
    Some(Service::new(kind, port))
}

fn ipv4_addresses(info: &ServiceInfo) -> Vec<Ipv4Addr> {
    info.get_addresses()
        .iter()
        .filter_map(|addr| match addr {
            IpAddr::V4(v4) => Some(*v4),
            IpAddr::V6(_) => None,
        })
        .collect()
}

#[async_trait]
impl Discoverer for MdnsDiscoverer {
    fn source(&self) -> DiscoverySource {
        DiscoverySource::Mdns
    }

    fn name(&self) -> &'static str {
        "mdns"
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
        let daemon = ServiceDaemon::new().context("starting mDNS daemon")?;

        let mut types = if self.meta_query {
            self.enumerate_types(&daemon, &cancel).await
        } else {
            Vec::new()
        };
        if types.is_empty() {
            types = self
                .service_types
                .iter()
                .map(|ty| mdns_wire::normalize_service_type(ty))
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
        }
        tracing::debug!("mdns: browsing {} service types", types.len());

        let browses = types
            .iter()
            .map(|ty| self.browse_type(&daemon, ty, deadline, &tx, &cancel));
        let emitted: usize = future::join_all(browses).await.into_iter().sum();
        tracing::debug!("mdns: {emitted} observations from {} types", types.len());

        if let Err(err) = daemon.shutdown() {
            tracing::debug!("mdns daemon shutdown: {err}");
        }
        Ok(())
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
