use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vigil_camera::{CameraError, Capture, Frame};
use vigil_pipeline::{CaptureFactory, FrameQueue, FrameSource, OverflowPolicy};

fn test_frame() -> Frame {
    Frame::rgb8(2, 2, vec![0u8; 12]).unwrap()
}

/// Yields a fixed number of frames, then end of stream (or an error).
struct ScriptedCapture {
    frames_left: usize,
    fail_at_end: bool,
    released: Arc<AtomicUsize>,
}

impl Capture for ScriptedCapture {
    fn read(&mut self) -> Result<Option<Frame>, CameraError> {
        if self.frames_left == 0 {
            if self.fail_at_end {
                return Err(CameraError::Stream("simulated read failure".to_string()));
            }
            return Ok(None);
        }
        self.frames_left -= 1;
        Ok(Some(test_frame()))
    }

    fn release(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory that hands out pre-built captures, counting invocations.
fn scripted_factory(
    captures: Vec<ScriptedCapture>,
    invocations: Arc<AtomicUsize>,
) -> CaptureFactory {
    let captures = Mutex::new(captures.into_iter());
    Arc::new(move || {
        invocations.fetch_add(1, Ordering::SeqCst);
        captures
            .lock()
            .unwrap()
            .next()
            .map(|c| Box::new(c) as Box<dyn Capture + Send>)
            .ok_or_else(|| CameraError::Device("no capture available".to_string()))
    })
}

fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            std::time::Instant::now() < deadline,
            "condition not met within 5s"
        );
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_frames_reach_queue_until_end_of_stream() {
    let queue = Arc::new(FrameQueue::new(8, OverflowPolicy::DropNewest));
    let released = Arc::new(AtomicUsize::new(0));
    let invocations = Arc::new(AtomicUsize::new(0));

    let capture = ScriptedCapture {
        frames_left: 3,
        fail_at_end: false,
        released: Arc::clone(&released),
    };
    let mut source = FrameSource::new(
        Arc::clone(&queue),
        scripted_factory(vec![capture], Arc::clone(&invocations)),
    );

    source.start();
    wait_for(|| released.load(Ordering::SeqCst) == 1);

    assert_eq!(queue.len(), 3);
    source.stop(None);
    // Release ran exactly once even though stop also joined the thread.
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn test_read_failure_terminates_loop_and_releases() {
    let queue = Arc::new(FrameQueue::new(8, OverflowPolicy::DropNewest));
    let released = Arc::new(AtomicUsize::new(0));
    let invocations = Arc::new(AtomicUsize::new(0));

    let capture = ScriptedCapture {
        frames_left: 1,
        fail_at_end: true,
        released: Arc::clone(&released),
    };
    let mut source = FrameSource::new(
        Arc::clone(&queue),
        scripted_factory(vec![capture], Arc::clone(&invocations)),
    );

    source.start();
    wait_for(|| released.load(Ordering::SeqCst) == 1);

    // The frame read before the failure still made it through.
    assert_eq!(queue.len(), 1);
    source.stop(None);
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn test_start_is_idempotent_while_running() {
    struct EndlessCapture {
        released: Arc<AtomicUsize>,
    }
    impl Capture for EndlessCapture {
        fn read(&mut self) -> Result<Option<Frame>, CameraError> {
            std::thread::sleep(Duration::from_millis(2));
            Ok(Some(test_frame()))
        }
        fn release(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    let queue = Arc::new(FrameQueue::new(2, OverflowPolicy::DropNewest));
    let released = Arc::new(AtomicUsize::new(0));
    let invocations = Arc::new(AtomicUsize::new(0));

    let factory: CaptureFactory = {
        let released = Arc::clone(&released);
        let invocations = Arc::clone(&invocations);
        Arc::new(move || {
            invocations.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(EndlessCapture {
                released: Arc::clone(&released),
            }) as Box<dyn Capture + Send>)
        })
    };

    let mut source = FrameSource::new(Arc::clone(&queue), factory);

    source.start();
    wait_for(|| !queue.is_empty());
    source.start();
    source.start();
    assert_eq!(invocations.load(Ordering::SeqCst), 1);

    source.stop(Some(Duration::from_secs(5)));
    assert_eq!(released.load(Ordering::SeqCst), 1);

    // Stop again: no-op.
    source.stop(None);
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn test_full_queue_drops_frames_without_blocking_capture() {
    let queue = Arc::new(FrameQueue::new(2, OverflowPolicy::DropNewest));
    let released = Arc::new(AtomicUsize::new(0));
    let invocations = Arc::new(AtomicUsize::new(0));

    // 10 frames into a capacity-2 queue with nobody consuming.
    let capture = ScriptedCapture {
        frames_left: 10,
        fail_at_end: false,
        released: Arc::clone(&released),
    };
    let mut source = FrameSource::new(
        Arc::clone(&queue),
        scripted_factory(vec![capture], Arc::clone(&invocations)),
    );

    source.start();
    // The loop runs to end of stream without blocking on the full queue.
    wait_for(|| released.load(Ordering::SeqCst) == 1);

    assert_eq!(queue.len(), 2);
    source.stop(None);
}

#[test]
fn test_factory_failure_exits_cleanly() {
    let queue: Arc<FrameQueue<Frame>> = Arc::new(FrameQueue::new(2, OverflowPolicy::DropNewest));
    let invocations = Arc::new(AtomicUsize::new(0));

    let mut source = FrameSource::new(
        Arc::clone(&queue),
        scripted_factory(Vec::new(), Arc::clone(&invocations)),
    );

    source.start();
    wait_for(|| invocations.load(Ordering::SeqCst) == 1);
    source.stop(None);

    assert!(queue.is_empty());
    assert!(!source.is_running());
}
