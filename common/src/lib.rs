//! # lanwatch common
//!
//! Shared vocabulary for every `lanwatch` crate: the device data model, IPv4
//! address arithmetic, the service catalog, configuration, errors and the
//! collaborator traits (vendor lookup, snapshot storage) the engine is wired to.

pub mod config;
pub mod device;
pub mod error;
pub mod log;
pub mod network;
pub mod policy;
pub mod scan;
pub mod services;
pub mod snapshot;
pub mod vendors;

#[doc(hidden)]
pub use tracing;
