//! Shared utilities for the fairdraw workspace.

pub mod logging;

pub use logging::{init_logging, LogFormat};
