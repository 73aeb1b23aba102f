//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Entry point for the matching engine server. Wires configuration, storage, the event system,
// the order book worker and the HTTP API together, then serves until Ctrl-C.
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use order_matching_engine::{
    Api, AppState, Args, Config, EventBus, EventDispatcher, InMemoryRepository,
    JournalEventHandler, OrderBookWorker, OrderRepository,
};

/// Events per journal file before rotating
const JOURNAL_EVENTS_PER_FILE: usize = 10_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = Config::try_from_env()
        .context("failed to load configuration")?
        .with_args(args);

    let event_bus = EventBus::new(config.event_bus_capacity);

    let dispatcher = EventDispatcher::new(event_bus.clone());
    if let Some(dir) = &config.event_log_dir {
        let journal = JournalEventHandler::new(dir, JOURNAL_EVENTS_PER_FILE)
            .with_context(|| format!("failed to create event journal in {}", dir.display()))?;
        dispatcher.register_handler(Arc::new(journal)).await;
        info!("Journaling events to {}", dir.display());
    }
    let _dispatcher_handle = dispatcher.start();

    let repository: Arc<dyn OrderRepository> = Arc::new(InMemoryRepository::new());
    let (client, worker_handle) = OrderBookWorker::new(repository.clone(), event_bus.clone())
        .with_command_buffer(config.command_buffer)
        .start();

    let state = AppState::new(client.clone(), repository, event_bus, config.depth_limit);
    let api = Api::new(config.addr, state);

    api.serve(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received");
    })
    .await
    .context("API server failed")?;

    client.shutdown().await.ok();
    tokio::task::spawn_blocking(move || worker_handle.join())
        .await
        .context("failed to join worker thread")?
        .map_err(|_| anyhow::anyhow!("worker thread panicked"))?;

    info!("Matching engine stopped");
    Ok(())
}
