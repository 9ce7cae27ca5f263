use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use vigil_infer::Detections;

/// Wire schema version stamped into every message.
pub const SCHEMA_VERSION: &str = "1.0";

/// Pipeline metadata attached to each detection message.
///
/// The timing fields are not populated by this pipeline and stay null on the
/// wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessingInfo {
    pub frame_stride: u32,
    pub inference_ms: Option<f64>,
    pub postprocess_ms: Option<f64>,
}

/// One detection message, built per sampled frame when inference completes.
///
/// Immutable after construction. `detections` carries the engine output
/// verbatim; the pipeline imposes no schema on its elements.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionMessage {
    pub schema_version: String,
    pub timestamp_ms: u64,
    pub frame_id: u64,
    pub source: String,
    pub model: String,
    pub detections: Detections,
    pub processing: ProcessingInfo,
}

impl DetectionMessage {
    pub fn new(
        frame_id: u64,
        source: &str,
        model: &str,
        detections: Detections,
        frame_stride: u32,
    ) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            timestamp_ms,
            frame_id,
            source: source.to_string(),
            model: model.to_string(),
            detections,
            processing: ProcessingInfo {
                frame_stride,
                inference_ms: None,
                postprocess_ms: None,
            },
        }
    }
}
