use std::fmt;

#[derive(Debug)]
pub enum ComError {
    Io(std::io::Error),
    Json(serde_json::Error),
    ConnectionClosed,
    Closed,
    RoleMismatch(&'static str),
    Endpoint(String),
    Config(String),
    MessageTooLarge(usize),
}

impl fmt::Display for ComError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComError::Io(err) => write!(f, "io error: {err}"),
            ComError::Json(err) => write!(f, "json error: {err}"),
            ComError::ConnectionClosed => write!(f, "connection closed"),
            ComError::Closed => write!(f, "bus already closed"),
            ComError::RoleMismatch(msg) => write!(f, "role mismatch: {msg}"),
            ComError::Endpoint(msg) => write!(f, "invalid endpoint: {msg}"),
            ComError::Config(msg) => write!(f, "invalid config: {msg}"),
            ComError::MessageTooLarge(len) => write!(f, "message too large: {len} bytes"),
        }
    }
}

impl std::error::Error for ComError {}

impl From<std::io::Error> for ComError {
    fn from(err: std::io::Error) -> Self {
        ComError::Io(err)
    }
}

impl From<serde_json::Error> for ComError {
    fn from(err: serde_json::Error) -> Self {
        ComError::Json(err)
    }
}
