//! Logging setup.
//!
//! Engine code only talks to the `log` facade; this module installs the
//! `env_logger` backend for binaries built on the engine.

mod init;

pub use init::{init_logging, LoggingConfig};
