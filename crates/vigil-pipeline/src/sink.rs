use crate::{DetectionMessage, PipelineError};
use std::io::Write;
use vigil_com::{BusConfig, MessageBus, Role};

/// Where the producer emits detection messages.
///
/// Exactly one sink exists per orchestrator: the console, an injected
/// writer (tests, custom sinks), or the message bus.
pub enum MessageSink {
    Console,
    Writer(Box<dyn Write + Send>),
    Bus(MessageBus<DetectionMessage>),
    /// Terminal state after `close`; emitting is an error.
    Closed,
}

impl MessageSink {
    /// Resolve the sink from the producer's output options.
    ///
    /// Exactly one of console output and a bus endpoint must be selected;
    /// anything else is a configuration error, raised before any socket is
    /// opened. A transport that cannot be opened is a dependency failure.
    pub async fn from_options(
        output_console: bool,
        endpoint: Option<&str>,
        socket_type: &str,
    ) -> Result<Self, PipelineError> {
        match (output_console, endpoint) {
            (true, None) => Ok(MessageSink::Console),
            (true, Some(_)) => Err(PipelineError::Config(
                "console output and an ipc endpoint are mutually exclusive".to_string(),
            )),
            (false, None) => Err(PipelineError::Config(
                "ipc endpoint is required when not outputting to console".to_string(),
            )),
            (false, Some(endpoint)) => {
                let role: Role = socket_type
                    .parse()
                    .map_err(|e: vigil_com::ComError| PipelineError::Config(e.to_string()))?;
                if role != Role::Publish {
                    return Err(PipelineError::Config(format!(
                        "producer requires a PUB socket, got {socket_type:?}"
                    )));
                }
                let bus = MessageBus::open(BusConfig::new(endpoint, role))
                    .await
                    .map_err(|e| {
                        PipelineError::Dependency(format!(
                            "cannot open message bus at {endpoint}: {e}"
                        ))
                    })?;
                Ok(MessageSink::Bus(bus))
            }
        }
    }

    /// Emit one message: a single structured line on the console/writer, or
    /// a bus publish. Transport errors surface to the caller unretried.
    pub async fn emit(&mut self, message: &DetectionMessage) -> Result<(), PipelineError> {
        match self {
            MessageSink::Console => {
                let line = serde_json::to_string(message)?;
                println!("{line}");
                std::io::stdout().flush()?;
                Ok(())
            }
            MessageSink::Writer(writer) => {
                let line = serde_json::to_string(message)?;
                writeln!(writer, "{line}")?;
                writer.flush()?;
                Ok(())
            }
            MessageSink::Bus(bus) => bus.send(message).await.map_err(PipelineError::from),
            MessageSink::Closed => Err(PipelineError::Config(
                "message sink is closed".to_string(),
            )),
        }
    }

    /// Release whatever the sink owns: the bus connection, or the writer
    /// (dropped so its own teardown runs). Idempotent; the sink is unusable
    /// afterwards.
    pub async fn close(&mut self) {
        match std::mem::replace(self, MessageSink::Closed) {
            MessageSink::Bus(mut bus) => bus.close().await,
            MessageSink::Writer(writer) => drop(writer),
            MessageSink::Console | MessageSink::Closed => {}
        }
    }
}
