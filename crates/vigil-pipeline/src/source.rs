use crate::{FrameQueue, PushOutcome};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use vigil_camera::{CameraError, Capture, Frame};

/// Resolves the capture backend inside the capture thread.
///
/// Keeping the device behind a factory means the core never hard-depends on
/// a concrete camera library, and the thread that reads frames is the thread
/// that owns the handle.
pub type CaptureFactory =
    Arc<dyn Fn() -> Result<Box<dyn Capture + Send>, CameraError> + Send + Sync>;

/// Reads frames from a camera device and enqueues them for processing.
///
/// Runs on a dedicated thread; never blocks on a full queue (the queue's
/// overflow policy resolves that). `start` and `stop` are both idempotent.
pub struct FrameSource {
    queue: Arc<FrameQueue<Frame>>,
    factory: CaptureFactory,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl FrameSource {
    pub fn new(queue: Arc<FrameQueue<Frame>>, factory: CaptureFactory) -> Self {
        Self {
            queue,
            factory,
            stop: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Spawn the capture thread. No-op if it is already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        self.stop.store(false, Ordering::SeqCst);

        let queue = Arc::clone(&self.queue);
        let factory = Arc::clone(&self.factory);
        let stop = Arc::clone(&self.stop);

        match thread::Builder::new()
            .name("camera-reader".to_string())
            .spawn(move || capture_loop(factory, queue, stop))
        {
            Ok(handle) => {
                self.thread = Some(handle);
                log::info!("frame source started");
            }
            Err(e) => log::error!("failed to spawn capture thread: {}", e),
        }
    }

    /// Signal the capture thread to exit and join it.
    ///
    /// With a timeout, polls for thread exit and detaches with a warning if
    /// the bound elapses (a blocked camera read can hold the thread). No-op
    /// if the source is not running.
    pub fn stop(&mut self, timeout: Option<Duration>) {
        self.stop.store(true, Ordering::SeqCst);

        let Some(handle) = self.thread.take() else {
            return;
        };

        match timeout {
            None => {
                let _ = handle.join();
            }
            Some(bound) => {
                let deadline = Instant::now() + bound;
                while !handle.is_finished() && Instant::now() < deadline {
                    thread::sleep(Duration::from_millis(10));
                }
                if handle.is_finished() {
                    let _ = handle.join();
                } else {
                    log::warn!("capture thread did not exit within {:?}, detaching", bound);
                    return;
                }
            }
        }

        log::info!("frame source stopped");
    }
}

/// Releases the capture handle exactly once, on every exit path of the
/// capture loop including panics.
struct ReleaseGuard(Box<dyn Capture + Send>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}

fn capture_loop(factory: CaptureFactory, queue: Arc<FrameQueue<Frame>>, stop: Arc<AtomicBool>) {
    let capture = match factory() {
        Ok(capture) => capture,
        Err(e) => {
            log::error!("capture unavailable: {}", e);
            return;
        }
    };
    let mut guard = ReleaseGuard(capture);

    while !stop.load(Ordering::SeqCst) {
        let frame = match guard.0.read() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                // End of stream, not a crash.
                log::warn!("camera read returned no frame");
                break;
            }
            Err(e) => {
                log::error!("camera read failed: {}", e);
                break;
            }
        };

        match queue.push(frame) {
            PushOutcome::Enqueued => {}
            outcome => {
                // Drop frames if downstream is slower than capture.
                log::debug!("queue full, overflow resolved as {:?}", outcome);
            }
        }
    }
}
