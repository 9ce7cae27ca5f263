use crate::{Completion, Detections, InferError, InferenceEngine};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use vigil_camera::Frame;

impl From<ort::Error> for InferError {
    fn from(err: ort::Error) -> Self {
        InferError::Runtime(err.to_string())
    }
}

/// ONNX Runtime inference backend.
///
/// The session is created eagerly so a missing or malformed model fails at
/// construction rather than inside the run loop. Inference runs inline on the
/// caller's thread and fulfills the completion channel before returning.
pub struct OrtEngine {
    session: Option<Session>,
    input_name: String,
    batch_size: usize,
}

impl std::fmt::Debug for OrtEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtEngine")
            .field("session", &self.session.is_some())
            .field("input_name", &self.input_name)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl OrtEngine {
    /// Load a model from an ONNX file.
    pub fn new(model_path: impl AsRef<Path>, batch_size: usize) -> Result<Self, InferError> {
        let path = model_path.as_ref();
        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| {
                InferError::Unavailable(format!("failed to load model {:?}: {e}", path))
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| InferError::Unavailable("model declares no inputs".to_string()))?;

        log::info!(
            "initialized onnx engine (model={:?}, input={}, batch_size={})",
            path,
            input_name,
            batch_size
        );

        Ok(Self {
            session: Some(session),
            input_name,
            batch_size,
        })
    }

    /// Pack RGB8 frames into an NCHW f32 tensor normalized to 0-1.
    fn preprocess(&self, batch: &[Frame]) -> Result<Tensor<f32>, InferError> {
        let first = batch
            .first()
            .ok_or_else(|| InferError::Shape("empty batch".to_string()))?;
        let (w, h) = (first.width() as usize, first.height() as usize);

        for frame in batch {
            if frame.width() as usize != w || frame.height() as usize != h {
                return Err(InferError::Shape(format!(
                    "mixed frame sizes in batch: {}x{} vs {}x{}",
                    frame.width(),
                    frame.height(),
                    w,
                    h
                )));
            }
        }

        let mut data = Vec::with_capacity(batch.len() * 3 * h * w);
        for frame in batch {
            let pixels = frame.data();
            for c in 0..3 {
                for y in 0..h {
                    for x in 0..w {
                        data.push(pixels[(y * w + x) * 3 + c] as f32 / 255.0);
                    }
                }
            }
        }

        Tensor::from_array(([batch.len(), 3, h, w], data)).map_err(InferError::from)
    }
}

impl InferenceEngine for OrtEngine {
    fn run(&mut self, batch: Vec<Frame>, done: Completion) -> Result<(), InferError> {
        let input = self.preprocess(&batch)?;

        let session = self
            .session
            .as_mut()
            .ok_or_else(|| InferError::Unavailable("engine closed".to_string()))?;

        let outputs = session.run(ort::inputs![self.input_name.as_str() => input])?;

        // Pass outputs through opaquely: one JSON object per output binding.
        // No detection schema is imposed here.
        let mut detections: Detections = Vec::new();
        for (name, value) in outputs.iter() {
            match value.try_extract_tensor::<f32>() {
                Ok((shape, data)) => {
                    let dims: Vec<i64> = shape.iter().copied().collect();
                    detections.push(serde_json::json!({
                        "name": name,
                        "shape": dims,
                        "data": data,
                    }));
                }
                Err(e) => {
                    log::debug!("skipping non-f32 output {}: {}", name, e);
                    detections.push(serde_json::json!({ "name": name }));
                }
            }
        }

        if done.send(detections).is_err() {
            log::debug!("inference completion dropped by caller");
        }

        Ok(())
    }

    fn close(&mut self) {
        if self.session.take().is_some() {
            log::info!("closed onnx engine");
        }
    }
}
