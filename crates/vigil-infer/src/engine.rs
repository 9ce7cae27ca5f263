use crate::InferError;
use tokio::sync::oneshot;
use vigil_camera::Frame;

/// Raw detector output, passed through the pipeline without interpretation.
///
/// Each element is whatever JSON value the backend produced for one output
/// binding. An empty vector means the model reported nothing.
pub type Detections = Vec<serde_json::Value>;

/// Single-shot completion channel for one inference invocation.
///
/// The engine is the sole writer; it may fulfill the channel inline from
/// `run` or later from a thread it owns. Dropping the sender without sending
/// signals that the invocation failed and no result will arrive.
pub type Completion = oneshot::Sender<Detections>;

/// Inference engine seam.
///
/// `run` accepts a preprocessed frame batch and a completion channel, and
/// returns as soon as the invocation has been handed to the backend.
pub trait InferenceEngine {
    fn run(&mut self, batch: Vec<Frame>, done: Completion) -> Result<(), InferError>;

    /// Release the accelerator handle. Idempotent.
    fn close(&mut self);
}
