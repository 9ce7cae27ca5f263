use crate::{CameraError, Frame};

/// Capture trait for camera backends.
///
/// Implementations hand out decoded RGB8 frames one at a time. `read` may
/// block until a frame is available; `Ok(None)` means the stream has ended
/// and no further frames will arrive.
pub trait Capture {
    /// Read the next frame from the device.
    fn read(&mut self) -> Result<Option<Frame>, CameraError>;

    /// Release the underlying device.
    ///
    /// Must be idempotent; callers may invoke it more than once during
    /// shutdown.
    fn release(&mut self);
}
