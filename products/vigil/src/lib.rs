//! Command line entry points for the vigil detection pipeline.
//!
//! Two binaries live here: `cv-processor` (camera to detection messages) and
//! `output-processor` (detection messages to stdout). The argument structs
//! are in this library so they can be unit tested.

pub mod cli;

pub use cli::{ConsumerArgs, ProducerArgs};
