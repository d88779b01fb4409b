use std::fmt;

/// Outcome of a single liveness probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeResult {
    pub alive: bool,
    pub rtt_millis: Option<f64>,
}

impl ProbeResult {
    pub fn alive(rtt_millis: f64) -> Self {
        Self {
            alive: true,
            rtt_millis: Some(rtt_millis),
        }
    }

    pub fn dead() -> Self {
        Self {
            alive: false,
            rtt_millis: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanProgress {
    pub scanned: usize,
    pub total: usize,
}

impl ScanProgress {
    pub fn new(total: usize) -> Self {
        Self { scanned: 0, total }
    }

    pub fn is_complete(&self) -> bool {
        self.scanned >= self.total
    }

    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.scanned as f64 / self.total as f64
        }
    }
}

impl fmt::Display for ScanProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scanned, self.total)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ScanPhase {
    #[default]
    Idle,
    Discovery,
    TcpSweep,
    IcmpFallback,
    PortScan,
    Finished,
    Cancelled,
}

impl ScanPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, ScanPhase::Finished | ScanPhase::Cancelled)
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScanPhase::Idle => "idle",
            ScanPhase::Discovery => "discovery",
            ScanPhase::TcpSweep => "tcp sweep",
            ScanPhase::IcmpFallback => "icmp fallback",
            ScanPhase::PortScan => "port scan",
            ScanPhase::Finished => "finished",
            ScanPhase::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}
