//! Shared fakes for the integration tests.

pub mod support;
