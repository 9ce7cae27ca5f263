use clap::Parser;
use vigil::ProducerArgs;
use vigil_base::{init_stdout_logger, log_fatal};
use vigil_infer::InferenceEngine;
use vigil_pipeline::{CaptureFactory, MessageSink, Orchestrator, OrchestratorConfig};

#[cfg(feature = "ort")]
fn build_engine(
    network: &std::path::Path,
    batch_size: usize,
) -> Box<dyn InferenceEngine + Send> {
    match vigil_infer::OrtEngine::new(network, batch_size) {
        Ok(engine) => Box::new(engine),
        Err(e) => log_fatal!("cannot initialize inference engine: {}", e),
    }
}

#[cfg(not(feature = "ort"))]
fn build_engine(
    _network: &std::path::Path,
    _batch_size: usize,
) -> Box<dyn InferenceEngine + Send> {
    log_fatal!("no inference backend compiled in (rebuild with --features ort)")
}

#[cfg(feature = "v4l2")]
fn capture_factory(camera_index: u32) -> CaptureFactory {
    use vigil_camera::{CameraConfig, Capture, V4l2Camera};

    // The device opens on the capture thread, not here.
    std::sync::Arc::new(move || {
        V4l2Camera::new(CameraConfig::for_index(camera_index))
            .map(|camera| Box::new(camera) as Box<dyn Capture + Send>)
    })
}

#[cfg(not(feature = "v4l2"))]
fn capture_factory(_camera_index: u32) -> CaptureFactory {
    log_fatal!("no camera backend compiled in (rebuild with --features v4l2)")
}

#[tokio::main]
async fn main() {
    init_stdout_logger();
    let args = ProducerArgs::parse();

    if args.batch_size < 1 {
        log_fatal!("batch_size must be >= 1");
    }

    let sink = match MessageSink::from_options(
        args.output_console,
        args.ipc_endpoint.as_deref(),
        &args.ipc_socket_type,
    )
    .await
    {
        Ok(sink) => sink,
        Err(e) => log_fatal!("invalid output configuration: {}", e),
    };

    let engine = build_engine(&args.network, args.batch_size);

    let config = OrchestratorConfig::default()
        .with_frame_stride(args.frame_stride)
        .with_queue_capacity(args.queue_maxsize)
        .with_source_label(format!("camera-{}", args.camera_index));

    let mut orchestrator =
        match Orchestrator::new(config, capture_factory(args.camera_index), engine, sink) {
            Ok(orchestrator) => orchestrator,
            Err(e) => log_fatal!("invalid pipeline configuration: {}", e),
        };

    let stop = orchestrator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("interrupt received, shutting down");
            stop.stop();
        }
    });

    if let Err(e) = orchestrator.run(args.max_frames).await {
        log_fatal!("pipeline failed: {}", e);
    }
}
