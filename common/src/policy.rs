use std::collections::HashMap;

use crate::device::DiscoverySource;

/// Which discovery sources may claim a device, and in what order.
///
/// A source with a rank is *claimable*; higher ranks replace lower ones.
/// Sources without a rank never overwrite an existing source, and a device
/// first seen through one is recorded as [`DiscoverySource::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePolicy {
    ranks: HashMap<DiscoverySource, u8>,
}

impl SourcePolicy {
    pub fn from_ranks(ranks: impl IntoIterator<Item = (DiscoverySource, u8)>) -> Self {
        Self {
            ranks: ranks.into_iter().collect(),
        }
    }

    /// Ranks SSDP and WS-Discovery as claimable, below ping.
    pub fn inclusive() -> Self {
        Self::from_ranks([
            (DiscoverySource::WsDiscovery, 1),
            (DiscoverySource::Ssdp, 2),
            (DiscoverySource::Ping, 3),
            (DiscoverySource::Arp, 4),
            (DiscoverySource::Mdns, 5),
        ])
    }

    pub fn rank(&self, source: DiscoverySource) -> Option<u8> {
        self.ranks.get(&source).copied()
    }

    pub fn claimable(&self, source: DiscoverySource) -> bool {
        self.ranks.contains_key(&source)
    }

    /// Source recorded for a device created by `incoming`.
    pub fn initial_source(&self, incoming: DiscoverySource) -> DiscoverySource {
        if self.claimable(incoming) {
            incoming
        } else {
            DiscoverySource::Unknown
        }
    }

    pub fn should_replace(&self, current: DiscoverySource, incoming: DiscoverySource) -> bool {
        let Some(incoming_rank) = self.rank(incoming) else {
            return false;
        };
        match self.rank(current) {
            Some(current_rank) => incoming_rank > current_rank,
            None => true,
        }
    }
}

impl Default for SourcePolicy {
    fn default() -> Self {
        Self::from_ranks([
            (DiscoverySource::Ping, 1),
            (DiscoverySource::Arp, 2),
            (DiscoverySource::Mdns, 3),
        ])
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
