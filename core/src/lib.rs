//! # lanwatch core
//!
//! The discovery and classification engine. A [`orchestrator::ScanOrchestrator`]
//! drives the discovery probes, the TCP/ICMP liveness sweep and per-host port
//! scans, streaming everything it learns into the single-writer
//! [`registry`], which merges observations and runs the [`classifier`].

pub mod classifier;
pub mod discovery;
pub mod liveness;
pub mod orchestrator;
pub mod ports;
pub mod registry;
pub mod store;
pub mod vendors;
