//! Camera capture abstraction for the vigil pipeline.
//!
//! This crate provides the `Frame` type, a synchronous `Capture` trait for
//! frame sources, and backend implementations for concrete camera APIs.

pub mod config;
pub mod convert;
pub mod error;
pub mod frame;
pub mod traits;

#[cfg(feature = "v4l2")]
pub mod v4l2;

pub use config::CameraConfig;
pub use convert::resize_rgb;
pub use error::CameraError;
pub use frame::Frame;
pub use traits::Capture;

#[cfg(feature = "v4l2")]
pub use v4l2::V4l2Camera;
