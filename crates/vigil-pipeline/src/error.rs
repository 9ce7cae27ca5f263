use std::fmt;
use vigil_camera::CameraError;
use vigil_com::ComError;
use vigil_infer::InferError;

#[derive(Debug)]
pub enum PipelineError {
    /// Invalid construction arguments. Raised before any thread or socket
    /// exists; never retried.
    Config(String),
    /// A required external collaborator could not be instantiated.
    Dependency(String),
    Camera(CameraError),
    Infer(InferError),
    Com(ComError),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Config(msg) => write!(f, "configuration error: {msg}"),
            PipelineError::Dependency(msg) => write!(f, "dependency unavailable: {msg}"),
            PipelineError::Camera(err) => write!(f, "camera error: {err}"),
            PipelineError::Infer(err) => write!(f, "inference error: {err}"),
            PipelineError::Com(err) => write!(f, "transport error: {err}"),
            PipelineError::Io(err) => write!(f, "io error: {err}"),
            PipelineError::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<CameraError> for PipelineError {
    fn from(err: CameraError) -> Self {
        PipelineError::Camera(err)
    }
}

impl From<InferError> for PipelineError {
    fn from(err: InferError) -> Self {
        PipelineError::Infer(err)
    }
}

impl From<ComError> for PipelineError {
    fn from(err: ComError) -> Self {
        PipelineError::Com(err)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Json(err)
    }
}
