use clap::Parser;
use vigil::ConsumerArgs;
use vigil_base::{init_stdout_logger, log_fatal};
use vigil_com::{BusConfig, MessageBus, Role};
use vigil_pipeline::OutputConsumer;

#[tokio::main]
async fn main() {
    init_stdout_logger();
    let args = ConsumerArgs::parse();

    let role = match args.ipc_socket_type.parse::<Role>() {
        Ok(Role::Subscribe) => Role::Subscribe,
        Ok(other) => log_fatal!("consumer requires a SUB socket, got {:?}", other),
        Err(e) => log_fatal!("invalid socket type: {}", e),
    };

    let config = BusConfig::new(&args.ipc_endpoint, role)
        .with_bind(args.should_bind())
        .with_subscribe(&args.subscribe);

    let bus: MessageBus<serde_json::Value> = match MessageBus::open(config).await {
        Ok(bus) => bus,
        Err(e) => log_fatal!("cannot open message bus at {}: {}", args.ipc_endpoint, e),
    };

    let mut consumer = OutputConsumer::new(bus);

    let stop = consumer.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            // The relay loop notices the flag after the in-flight receive.
            log::info!("interrupt received, shutting down");
            stop.stop();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("second interrupt, exiting immediately");
            std::process::exit(130);
        }
    });

    if let Err(e) = consumer.run(args.max_messages).await {
        log_fatal!("relay failed: {}", e);
    }
}
