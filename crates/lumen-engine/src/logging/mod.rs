//! Logging setup.
//!
//! Everything in the engine logs through the `log` facade. Protocol tracing
//! uses `tracing` events under a span the caller hands to the host; with no
//! subscriber installed those events are forwarded to `log` and end up in the
//! same `env_logger` output.

mod init;

pub use init::{init_logging, LoggingConfig};
