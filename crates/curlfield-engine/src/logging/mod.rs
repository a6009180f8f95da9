//! Logging utilities.
//!
//! Centralizes logger initialization. Library code only uses the `log` facade;
//! the binary decides on the backend by calling [`init_logging`] early in `main`.

mod init;

pub use init::{LoggingConfig, init_logging};
