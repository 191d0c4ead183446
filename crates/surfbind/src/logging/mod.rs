//! Logging setup.
//!
//! The crate itself only talks to the `log` facade; `init_logging` is a
//! convenience for binaries that have no logger of their own.

mod init;

pub use init::{init_logging, LoggingConfig};
