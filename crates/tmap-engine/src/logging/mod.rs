//! Logging utilities.
//!
//! The engine itself only talks to the `log` facade; this module is the
//! optional `env_logger` setup for binaries and tools built on it.

mod init;

pub use init::{init_logging, LoggingConfig};
