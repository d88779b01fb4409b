use thiserror::Error;

/// Errors surfaced by the scanning engine.
///
/// Per-host probe failures never show up here: they are folded into a dead
/// [`crate::scan::ProbeResult`]. The only abrupt termination is
/// [`ScanError::Cancelled`].
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan cancelled")]
    Cancelled,

    #[error("no interface available for LAN discovery")]
    NoInterface,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("`{command}` failed: {reason}")]
    Subprocess { command: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("registry unavailable: {0}")]
    Registry(String),

    #[error("snapshot store error: {0}")]
    Store(String),
}

impl ScanError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanError::Cancelled)
    }
}

/// Returns true if `err` (or anything in its chain) is a cancellation.
pub fn is_cancelled(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| matches!(cause.downcast_ref::<ScanError>(), Some(ScanError::Cancelled)))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
