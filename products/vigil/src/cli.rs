use clap::Parser;
use std::path::PathBuf;

/// Capture camera frames, run object detection, publish results.
#[derive(Parser, Debug)]
#[command(name = "cv-processor")]
pub struct ProducerArgs {
    /// Path to the ONNX model file.
    #[arg(long)]
    pub network: PathBuf,

    /// Frames per inference invocation.
    #[arg(long, default_value_t = 1)]
    pub batch_size: usize,

    /// Bus endpoint to publish to (e.g. tcp://127.0.0.1:5555).
    #[arg(long)]
    pub ipc_endpoint: Option<String>,

    /// Socket type for the bus endpoint.
    #[arg(long, default_value = "PUB")]
    pub ipc_socket_type: String,

    /// Print detection messages to stdout instead of publishing them.
    #[arg(long)]
    pub output_console: bool,

    /// Run inference on 1 in every N frames.
    #[arg(long, default_value_t = 1)]
    pub frame_stride: u32,

    /// Camera device index (/dev/video{N}).
    #[arg(long, default_value_t = 0)]
    pub camera_index: u32,

    /// Capacity of the frame queue between capture and inference.
    #[arg(long, default_value_t = 4)]
    pub queue_maxsize: usize,

    /// Stop after this many sampled frames.
    #[arg(long)]
    pub max_frames: Option<u64>,
}

/// Subscribe to detection messages and relay them to stdout.
#[derive(Parser, Debug)]
#[command(name = "output-processor")]
pub struct ConsumerArgs {
    /// Bus endpoint to receive from (e.g. tcp://127.0.0.1:5555).
    #[arg(long)]
    pub ipc_endpoint: String,

    /// Socket type for the bus endpoint.
    #[arg(long, default_value = "SUB")]
    pub ipc_socket_type: String,

    /// Bind the endpoint (the default).
    #[arg(long, overrides_with = "no_bind")]
    pub bind: bool,

    /// Connect to the endpoint instead of binding it.
    #[arg(long, overrides_with = "bind")]
    pub no_bind: bool,

    /// Subscription prefix filter; empty receives everything.
    #[arg(long, default_value = "")]
    pub subscribe: String,

    /// Stop after this many messages.
    #[arg(long)]
    pub max_messages: Option<u64>,
}

impl ConsumerArgs {
    /// Whether to bind the endpoint; `--no-bind` switches to connecting.
    pub fn should_bind(&self) -> bool {
        !self.no_bind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_producer_defaults() {
        let args =
            ProducerArgs::try_parse_from(["cv-processor", "--network", "model.onnx"]).unwrap();
        assert_eq!(args.network, PathBuf::from("model.onnx"));
        assert_eq!(args.batch_size, 1);
        assert_eq!(args.frame_stride, 1);
        assert_eq!(args.camera_index, 0);
        assert_eq!(args.queue_maxsize, 4);
        assert_eq!(args.ipc_socket_type, "PUB");
        assert!(!args.output_console);
        assert!(args.ipc_endpoint.is_none());
        assert!(args.max_frames.is_none());
    }

    #[test]
    fn test_producer_requires_network() {
        assert!(ProducerArgs::try_parse_from(["cv-processor"]).is_err());
    }

    #[test]
    fn test_producer_full_invocation() {
        let args = ProducerArgs::try_parse_from([
            "cv-processor",
            "--network",
            "yolo.onnx",
            "--ipc-endpoint",
            "tcp://127.0.0.1:5555",
            "--frame-stride",
            "5",
            "--camera-index",
            "2",
            "--max-frames",
            "100",
        ])
        .unwrap();
        assert_eq!(args.ipc_endpoint.as_deref(), Some("tcp://127.0.0.1:5555"));
        assert_eq!(args.frame_stride, 5);
        assert_eq!(args.camera_index, 2);
        assert_eq!(args.max_frames, Some(100));
    }

    #[test]
    fn test_consumer_defaults_to_bound_subscriber() {
        let args = ConsumerArgs::try_parse_from([
            "output-processor",
            "--ipc-endpoint",
            "tcp://127.0.0.1:5555",
        ])
        .unwrap();
        assert_eq!(args.ipc_socket_type, "SUB");
        assert!(args.should_bind());
        assert_eq!(args.subscribe, "");
        assert!(args.max_messages.is_none());
    }

    #[test]
    fn test_consumer_can_connect_instead_of_bind() {
        let args = ConsumerArgs::try_parse_from([
            "output-processor",
            "--ipc-endpoint",
            "tcp://127.0.0.1:5555",
            "--no-bind",
            "--subscribe",
            "{\"schema_version\"",
        ])
        .unwrap();
        assert!(!args.should_bind());
        assert_eq!(args.subscribe, "{\"schema_version\"");
    }

    #[test]
    fn test_consumer_last_bind_flag_wins() {
        let args = ConsumerArgs::try_parse_from([
            "output-processor",
            "--ipc-endpoint",
            "tcp://127.0.0.1:5555",
            "--no-bind",
            "--bind",
        ])
        .unwrap();
        assert!(args.should_bind());
    }
}
