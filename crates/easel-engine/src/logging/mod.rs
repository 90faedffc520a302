//! Logging utilities.
//!
//! This module centralizes logger initialization and common diagnostics.
//! It only wires `env_logger` behind the standard `log` facade.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};