//! Inference engine seam for the vigil pipeline.
//!
//! The pipeline treats detector output as opaque: whatever the engine
//! produces is passed through to the detection message without structural
//! validation. Backends implement `InferenceEngine`; the ONNX Runtime
//! backend lives behind the `ort` feature.

pub mod engine;
pub mod error;

#[cfg(feature = "ort")]
pub mod onnx;

pub use engine::{Completion, Detections, InferenceEngine};
pub use error::InferError;

#[cfg(feature = "ort")]
pub use onnx::OrtEngine;
