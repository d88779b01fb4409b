use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use lanwatch_common::device::{ArpEntry, DiscoverySource, Observation};
use lanwatch_common::error::ScanError;
use lanwatch_common::warn;
use lanwatch_protocols::arp;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{Discoverer, emit};

/// Reads the operating system's neighbor (ARP) cache.
///
/// Only hosts the machine has recently talked to show up, so this is cheap
/// but incomplete; the orchestrator runs it again after the sweep has
/// populated the cache.
pub struct NeighborTableReader {
    command: Vec<String>,
    timeout: Duration,
}

impl NeighborTableReader {
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    /// Runs the configured command and parses its output.
    pub async fn read_table(&self) -> Result<Vec<ArpEntry>, ScanError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| ScanError::Subprocess {
                command: String::new(),
                reason: "empty neighbor table command".into(),
            })?;

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| self.subprocess_error("timed out"))?
            .map_err(|err| self.subprocess_error(&err.to_string()))?;

        if !output.status.success() {
            return Err(self.subprocess_error(&format!("exited with {}", output.status)));
        }

        Ok(arp::parse_neighbor_table(&String::from_utf8_lossy(&output.stdout)))
    }

    fn subprocess_error(&self, reason: &str) -> ScanError {
        ScanError::Subprocess {
            command: self.command.join(" "),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Discoverer for NeighborTableReader {
    fn source(&self) -> DiscoverySource {
        DiscoverySource::Arp
    }

    fn name(&self) -> &'static str {
        "neighbor table"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn discover(
        &self,
        tx: mpsc::Sender<Observation>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        let entries = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScanError::Cancelled).context("neighbor table"),
            entries = self.read_table() => entries,
        };

        let entries = match entries {
            Ok(entries) => entries,
            Err(err) => {
                warn!("{err}");
                return Ok(());
            }
        };

        tracing::debug!("neighbor table listed {} entries", entries.len());
        for entry in entries {
            if cancel.is_cancelled() || !emit(&tx, Observation::from(entry)).await {
                break;
            }
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
