use crate::{PipelineError, StopHandle};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use vigil_com::{ComError, MessageBus};

/// Receives bus messages and relays them verbatim to a sink.
///
/// Single-threaded: one blocking receive loop, no concurrent receivers. The
/// bus connection is closed on every exit path.
pub struct OutputConsumer {
    bus: MessageBus<serde_json::Value>,
    sink: Box<dyn Write + Send>,
    stop: Arc<AtomicBool>,
}

impl OutputConsumer {
    /// Relay to stdout.
    pub fn new(bus: MessageBus<serde_json::Value>) -> Self {
        Self::with_sink(bus, Box::new(std::io::stdout()))
    }

    /// Relay to an arbitrary writer (tests, downstream handlers).
    pub fn with_sink(bus: MessageBus<serde_json::Value>, sink: Box<dyn Write + Send>) -> Self {
        Self {
            bus,
            sink,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::from_flag(Arc::clone(&self.stop))
    }

    pub fn bus(&self) -> &MessageBus<serde_json::Value> {
        &self.bus
    }

    /// Receive messages and relay them, one structured line each.
    ///
    /// Stops after `max_messages` if set, or when every publisher has gone
    /// away. The transport is closed regardless of how the loop exits;
    /// transport failures surface to the caller after that.
    pub async fn run(&mut self, max_messages: Option<u64>) -> Result<(), PipelineError> {
        log::info!("output consumer run loop started");

        let result = self.run_loop(max_messages).await;
        self.bus.close().await;
        log::info!("output consumer shut down");
        result
    }

    async fn run_loop(&mut self, max_messages: Option<u64>) -> Result<(), PipelineError> {
        let mut processed: u64 = 0;

        loop {
            if self.stop.load(Ordering::SeqCst) {
                log::info!("stop requested, exiting relay loop");
                break;
            }

            let message = match self.bus.recv().await {
                Ok(message) => message,
                Err(ComError::ConnectionClosed) => {
                    // Publisher went away: end of stream, not a crash.
                    log::info!("publisher closed the connection");
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            let line = serde_json::to_string(&message)?;
            writeln!(self.sink, "{line}")?;
            self.sink.flush()?;

            processed += 1;
            if let Some(max) = max_messages {
                if processed >= max {
                    log::info!("reached max_messages={}, stopping", max);
                    break;
                }
            }
        }

        Ok(())
    }
}
