use crate::{Capture, CameraConfig, CameraError, Frame};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture as V4lCapture;
use v4l::{Device, Format, FourCC};

type FrameResult = Result<Frame, CameraError>;

/// V4L2 camera backend.
///
/// Opens the device eagerly in `new` (so a missing or incompatible camera
/// fails fast) and decodes MJPEG on an internal capture thread. `read` pulls
/// decoded frames from the thread's channel.
pub struct V4l2Camera {
    config: CameraConfig,
    device: Option<Device>,
    receiver: Option<Receiver<FrameResult>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for V4l2Camera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("V4l2Camera")
            .field("config", &self.config)
            .field("device", &"<v4l::Device>")
            .field("receiver", &self.receiver.is_some())
            .field("thread_handle", &self.thread_handle.is_some())
            .finish()
    }
}

impl Capture for V4l2Camera {
    fn read(&mut self) -> Result<Option<Frame>, CameraError> {
        // Ensure capture thread is running
        self.ensure_started()?;

        let receiver = self
            .receiver
            .as_mut()
            .ok_or_else(|| CameraError::Channel("receiver not initialized".to_string()))?;

        match receiver.recv() {
            Ok(Ok(frame)) => Ok(Some(frame)),
            Ok(Err(e)) => Err(e),
            // Capture thread exited and dropped the sender: end of stream.
            Err(_) => Ok(None),
        }
    }

    fn release(&mut self) {
        // Drop the receiver to signal the thread to stop
        drop(self.receiver.take());
        self.device.take();

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for V4l2Camera {
    fn drop(&mut self) {
        self.release();
    }
}

impl V4l2Camera {
    /// Create a new V4L2 camera with the given configuration.
    ///
    /// Opens the device at `config.device()`, sets MJPEG format at the
    /// requested resolution, and configures the frame rate.
    ///
    /// # Errors
    ///
    /// Returns `CameraError::Device` if:
    /// - The device cannot be opened
    /// - MJPEG format is not supported
    /// - Format or parameter setting fails
    pub fn new(config: CameraConfig) -> Result<Self, CameraError> {
        // Open V4L2 device
        let device = Device::with_path(config.device())?;

        // Set MJPEG format at requested resolution
        let mut format = Format::new(config.width(), config.height(), FourCC::new(b"MJPG"));
        format = V4lCapture::set_format(&device, &format)?;

        // Verify device accepted MJPEG (it might change to a different format)
        if format.fourcc != FourCC::new(b"MJPG") {
            return Err(CameraError::Device(
                "MJPEG format not supported by device".to_string(),
            ));
        }

        // Set frame rate
        let params = v4l::video::capture::Parameters::with_fps(config.fps());
        V4lCapture::set_params(&device, &params)?;

        Ok(Self {
            config,
            device: Some(device),
            receiver: None,
            thread_handle: None,
        })
    }

    /// Start the capture thread if not already running.
    ///
    /// This is called automatically on the first `read()` call.
    fn ensure_started(&mut self) -> Result<(), CameraError> {
        if self.receiver.is_some() {
            return Ok(());
        }

        // Take ownership of the device; the stream has to live on the
        // capture thread because it borrows the device.
        let device = self
            .device
            .take()
            .ok_or_else(|| CameraError::Device("device already consumed".to_string()))?;

        let buffer_count = self.config.buffer_count() as usize;
        let (tx, rx) = mpsc::sync_channel(buffer_count);

        let handle = thread::Builder::new()
            .name("v4l2-capture".to_string())
            .spawn(move || {
                if let Err(e) = Self::capture_loop(device, tx, buffer_count) {
                    log::error!("capture thread error: {}", e);
                }
            })
            .map_err(|e| CameraError::Channel(e.to_string()))?;

        self.receiver = Some(rx);
        self.thread_handle = Some(handle);

        Ok(())
    }

    /// Background thread capture loop.
    ///
    /// Reads frames from V4L2, decodes MJPEG, and sends frames through the channel.
    fn capture_loop(
        device: Device,
        tx: SyncSender<FrameResult>,
        buffer_count: usize,
    ) -> Result<(), CameraError> {
        let mut stream = MmapStream::with_buffers(&device, Type::VideoCapture, buffer_count as u32)
            .map_err(|e| CameraError::Stream(e.to_string()))?;

        loop {
            let (frame_data, _metadata) = CaptureStream::next(&mut stream)
                .map_err(|e| CameraError::Stream(e.to_string()))?;

            // Copy frame data (buffer is borrowed and only valid until next call)
            let frame_vec = frame_data.to_vec();

            let frame = match decode_mjpeg(&frame_vec) {
                Ok(frame) => frame,
                Err(e) => {
                    // Report the bad frame downstream and keep capturing.
                    if tx.send(Err(e)).is_err() {
                        break;
                    }
                    continue;
                }
            };

            // Send frame through channel (blocking if full)
            if tx.send(Ok(frame)).is_err() {
                // Receiver dropped - exit thread
                break;
            }
        }

        Ok(())
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }
}

/// Decode an MJPEG buffer to an RGB8 frame.
fn decode_mjpeg(data: &[u8]) -> Result<Frame, CameraError> {
    let image = image::load_from_memory(data)
        .map_err(|e| CameraError::Decode(e.to_string()))?
        .to_rgb8();
    let (width, height) = image.dimensions();
    Frame::rgb8(width, height, image.into_raw())
}
