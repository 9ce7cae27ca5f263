use crate::CameraError;

/// One captured image buffer.
///
/// Pixels are RGB8 in HWC order, 3 bytes per pixel, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Create a frame from raw RGB8 data.
    ///
    /// Returns `CameraError::Shape` if `data` is not `width * height * 3`
    /// bytes long or either dimension is zero.
    pub fn rgb8(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CameraError> {
        if width == 0 || height == 0 {
            return Err(CameraError::Shape(format!(
                "frame dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(CameraError::Shape(format!(
                "expected {} bytes for {}x{} RGB8, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}
