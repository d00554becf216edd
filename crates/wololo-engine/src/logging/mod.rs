//! Logging utilities.
//!
//! Construction stages of the renderer report progress through the `log` facade;
//! this module installs the `env_logger` backend once per process.

mod init;

pub use init::{init_logging, resolve_filter, LoggingConfig, VULKAN_TARGET};
