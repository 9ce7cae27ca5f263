//! Pipeline orchestration shared by the producer and consumer processes.
//!
//! The producer side captures frames on a dedicated thread, hands them
//! through a bounded drop-on-full queue, samples every Nth frame for
//! inference, and publishes one detection message per sampled frame. The
//! consumer side subscribes to the same transport and relays messages to a
//! sink. Everything with real concurrency, resource-lifecycle, or
//! failure-handling concerns lives here; camera, inference, and transport
//! backends are injected through the seams in the sibling crates.

pub mod consumer;
pub mod error;
pub mod message;
pub mod orchestrator;
pub mod queue;
pub mod sink;
pub mod source;

pub use consumer::OutputConsumer;
pub use error::PipelineError;
pub use message::{DetectionMessage, ProcessingInfo, SCHEMA_VERSION};
pub use orchestrator::{Orchestrator, OrchestratorConfig, StopHandle};
pub use queue::{FrameQueue, OverflowPolicy, PushOutcome};
pub use sink::MessageSink;
pub use source::{CaptureFactory, FrameSource};
