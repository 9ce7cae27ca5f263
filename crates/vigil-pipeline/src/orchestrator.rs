use crate::{
    CaptureFactory, DetectionMessage, FrameQueue, FrameSource, MessageSink, OverflowPolicy,
    PipelineError,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use vigil_camera::{Frame, resize_rgb};
use vigil_infer::InferenceEngine;

/// Configuration for the producer-side orchestrator.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    frame_stride: u32,
    resize_width: u32,
    resize_height: u32,
    queue_capacity: usize,
    overflow_policy: OverflowPolicy,
    poll_timeout: Duration,
    stop_join_timeout: Duration,
    source_label: String,
    model_label: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            frame_stride: 1,
            resize_width: 640,
            resize_height: 640,
            queue_capacity: 4,
            overflow_policy: OverflowPolicy::DropNewest,
            poll_timeout: Duration::from_millis(500),
            stop_join_timeout: Duration::from_secs(5),
            source_label: "camera-0".to_string(),
            model_label: "object-detect-v1".to_string(),
        }
    }
}

impl OrchestratorConfig {
    /// Only process 1 in every N frames.
    pub fn with_frame_stride(mut self, frame_stride: u32) -> Self {
        self.frame_stride = frame_stride;
        self
    }

    /// Set the model input size frames are resized to before inference.
    pub fn with_resize(mut self, width: u32, height: u32) -> Self {
        self.resize_width = width;
        self.resize_height = height;
        self
    }

    /// Set the frame queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the queue overflow policy.
    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Set how long one queue poll waits before rechecking stop conditions.
    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Set the bound on joining the capture thread during shutdown.
    pub fn with_stop_join_timeout(mut self, timeout: Duration) -> Self {
        self.stop_join_timeout = timeout;
        self
    }

    /// Set the source label stamped into messages.
    pub fn with_source_label(mut self, label: impl Into<String>) -> Self {
        self.source_label = label.into();
        self
    }

    /// Set the model label stamped into messages.
    pub fn with_model_label(mut self, label: impl Into<String>) -> Self {
        self.model_label = label.into();
        self
    }

    // Getters
    pub fn frame_stride(&self) -> u32 {
        self.frame_stride
    }

    pub fn resize_width(&self) -> u32 {
        self.resize_width
    }

    pub fn resize_height(&self) -> u32 {
        self.resize_height
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.overflow_policy
    }

    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    pub fn stop_join_timeout(&self) -> Duration {
        self.stop_join_timeout
    }

    pub fn source_label(&self) -> &str {
        &self.source_label
    }

    pub fn model_label(&self) -> &str {
        &self.model_label
    }

    fn validate(&self) -> Result<(), PipelineError> {
        if self.frame_stride < 1 {
            return Err(PipelineError::Config(
                "frame_stride must be >= 1".to_string(),
            ));
        }
        if self.resize_width < 1 || self.resize_height < 1 {
            return Err(PipelineError::Config(
                "resize_width/resize_height must be >= 1".to_string(),
            ));
        }
        if self.queue_capacity < 1 {
            return Err(PipelineError::Config(
                "queue_capacity must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Cross-thread cancellation for a running orchestrator or consumer loop.
///
/// The flag is checked once per loop iteration; `stop` is idempotent and may
/// be called from any thread.
#[derive(Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub(crate) fn from_flag(flag: Arc<AtomicBool>) -> Self {
        StopHandle(flag)
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Builds and runs the producer pipeline.
///
/// Owns the frame queue, the frame source, the inference engine, and the
/// message sink. Frame ids are assigned at dequeue time, strictly increasing
/// and gapless from 0, whether or not the frame is sampled for inference.
pub struct Orchestrator {
    config: OrchestratorConfig,
    queue: Arc<FrameQueue<Frame>>,
    source: FrameSource,
    engine: Box<dyn InferenceEngine + Send>,
    sink: MessageSink,
    stop: Arc<AtomicBool>,
    next_frame_id: u64,
}

impl Orchestrator {
    /// Validate the configuration and assemble the pipeline.
    ///
    /// Fails fast on invalid arguments; no thread or socket is created here
    /// beyond what the caller already opened for the sink.
    pub fn new(
        config: OrchestratorConfig,
        capture_factory: CaptureFactory,
        engine: Box<dyn InferenceEngine + Send>,
        sink: MessageSink,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        let queue = Arc::new(FrameQueue::new(
            config.queue_capacity(),
            config.overflow_policy(),
        ));
        let source = FrameSource::new(Arc::clone(&queue), capture_factory);

        Ok(Self {
            config,
            queue,
            source,
            engine,
            sink,
            stop: Arc::new(AtomicBool::new(false)),
            next_frame_id: 0,
        })
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stop))
    }

    /// Shared handle to the frame queue (the capture thread pushes into it).
    pub fn queue(&self) -> Arc<FrameQueue<Frame>> {
        Arc::clone(&self.queue)
    }

    /// Start the camera and run inference, sending results to the sink.
    ///
    /// Stops after `max_frames` sampled frames if set. Whatever way the loop
    /// exits, shutdown releases the source, the engine, and the transport, in
    /// that order.
    pub async fn run(&mut self, max_frames: Option<u64>) -> Result<(), PipelineError> {
        self.source.start();
        log::info!("orchestrator run loop started");

        let result = self.run_loop(max_frames).await;
        self.shutdown().await;
        result
    }

    async fn run_loop(&mut self, max_frames: Option<u64>) -> Result<(), PipelineError> {
        let mut processed: u64 = 0;

        loop {
            if self.stop.load(Ordering::SeqCst) {
                log::info!("stop requested, exiting run loop");
                break;
            }

            // Checked before the dequeue so a zero bound exits without
            // waiting for a frame.
            if let Some(max) = max_frames {
                if processed >= max {
                    log::info!("reached max_frames={}, stopping", max);
                    break;
                }
            }

            let Some(frame) = self.queue.pop(self.config.poll_timeout()).await else {
                continue;
            };

            let frame_id = self.next_frame_id;
            self.next_frame_id += 1;

            if frame_id % self.config.frame_stride() as u64 != 0 {
                continue;
            }

            let resized = resize_rgb(
                &frame,
                self.config.resize_width(),
                self.config.resize_height(),
            );

            let (done, completion) = oneshot::channel();
            self.engine.run(vec![resized], done)?;

            // The engine is the sole writer of this completion; it may
            // fulfill it inline or from its own thread. Only one inference
            // is in flight at a time.
            match completion.await {
                Ok(detections) => {
                    let message = DetectionMessage::new(
                        frame_id,
                        self.config.source_label(),
                        self.config.model_label(),
                        detections,
                        self.config.frame_stride(),
                    );
                    self.sink.emit(&message).await?;
                }
                Err(_) => {
                    log::warn!("inference completed without result for frame {}", frame_id);
                }
            }

            processed += 1;
        }

        Ok(())
    }

    /// Release everything in fixed order: drain the producer first, then the
    /// accelerator handle, then the transport. Each step runs unconditionally
    /// so every resource gets a release attempt.
    async fn shutdown(&mut self) {
        self.source.stop(Some(self.config.stop_join_timeout()));
        self.engine.close();
        self.sink.close().await;
        log::info!("orchestrator shut down");
    }
}
