//! Shared plumbing for the vigil pipeline crates.
//!
//! Currently this is just logging: a stdout backend for the `log` facade and
//! the `log_fatal!` macro used by the product binaries for startup failures.

pub mod logging;

pub use logging::{StdoutLogger, format_timestamp, init_stdout_logger};
