//! Logging utilities.
//!
//! Centralizes logger initialization. Everything else only talks to the `log`
//! facade.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};
