//! Logging utilities.
//!
//! This module centralizes logger initialization and fatal-error reporting on
//! top of the standard `log` facade.

mod init;

pub use init::{DEFAULT_FILTER, LoggingConfig, init_logging, trace_fatal};
