//! Progress spinner attached to the scan span.

use colored::*;
use indicatif::ProgressStyle;
use lanwatch_common::scan::{ScanPhase, ScanProgress};
use tokio::sync::watch;
use tracing::{Span, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

const TICKS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
    "▁▁▁▁▁",
];

fn style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

pub fn scan_span() -> Span {
    let span = info_span!("discovery", indicatif.pb_show = true);
    span.pb_set_style(&style());
    span.pb_set_message("Preparing scan...");
    span
}

pub fn status_line(phase: ScanPhase, progress: ScanProgress) -> String {
    match phase {
        ScanPhase::TcpSweep | ScanPhase::IcmpFallback => format!(
            "{} {} hosts ({:.0}%)",
            capitalize(&phase.to_string()),
            progress.to_string().green().bold(),
            progress.ratio() * 100.0
        ),
        ScanPhase::Discovery => "Listening for announcements...".to_string(),
        ScanPhase::PortScan => "Checking open ports...".to_string(),
        other => capitalize(&other.to_string()),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Mirrors the scan's phase and progress onto the spinner until the scan
/// reaches a terminal phase.
pub async fn follow(
    span: Span,
    mut phases: watch::Receiver<ScanPhase>,
    mut progress: watch::Receiver<ScanProgress>,
) {
    loop {
        let phase = *phases.borrow_and_update();
        if phase.is_terminal() {
            break;
        }
        span.pb_set_message(&status_line(phase, *progress.borrow_and_update()));

        tokio::select! {
            changed = phases.changed() => if changed.is_err() { break },
            changed = progress.changed() => if changed.is_err() { break },
        }
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
