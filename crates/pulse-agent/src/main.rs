mod alloc;
mod builder;
mod config;
mod sampler;
mod shipper;

use std::sync::Arc;
use std::time::Duration;

use pulse_codec::{Sealer, Signer};
use pulse_store::{MemoryStore, Store};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::builder::{BuildError, Builder};
use crate::config::AgentConfig;
use crate::sampler::Sampler;
use crate::shipper::Shipper;

#[global_allocator]
static ALLOCATOR: alloc::TrackingAllocator = alloc::TrackingAllocator;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match AgentConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        error!(error = %e, "agent failed");
        std::process::exit(1);
    }
}

async fn run(config: AgentConfig) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let sealer = match &config.crypto_key {
        Some(path) => Some(Sealer::from_pem_file(path)?),
        None => None,
    };

    let (requests_tx, requests_rx) = mpsc::channel(config.rate_limit.max(1));
    let sampler = Sampler::new(Arc::clone(&store));
    let builder = Builder::new(
        Arc::clone(&store),
        Signer::new(&config.key),
        sealer,
        requests_tx,
    );
    let shipper = Arc::new(Shipper::new(
        format!("http://{}/updates/", config.address),
        config.rate_limit,
    ));

    info!(
        server = %config.address,
        poll = ?config.poll_interval,
        report = ?config.report_interval,
        rate_limit = config.rate_limit,
        "agent started"
    );

    let sample_task = tokio::spawn(run_sampler(sampler, config.poll_interval, cancel.clone()));
    // The builder task owns the only sender; when it stops, the channel
    // closes and the shipper drains whatever is left before returning.
    let build_task = tokio::spawn(run_builder(builder, config.report_interval, cancel.clone()));
    let ship_task = tokio::spawn(shipper.run(requests_rx, cancel.clone()));

    let _ = tokio::join!(sample_task, build_task, ship_task);
    info!("agent stopped");
    Ok(())
}

async fn run_sampler(sampler: Sampler, every: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => sampler.tick().await,
            _ = cancel.cancelled() => return,
        }
    }
}

async fn run_builder(builder: Builder, every: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => match builder.build().await {
                Ok(()) => {}
                Err(BuildError::ChannelClosed) => return,
                Err(e) => warn!(error = %e, "batch build failed"),
            },
            _ = cancel.cancelled() => return,
        }
    }
}

fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut terminate = match signal(SignalKind::terminate()) {
                Ok(stream) => stream,
                Err(e) => {
                    error!(error = %e, "can not install SIGTERM handler");
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        info!("shutdown signal received");
        cancel.cancel();
    });
}
