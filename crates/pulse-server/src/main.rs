use std::sync::Arc;
use std::time::Duration;

use pulse_codec::{Opener, Signer};
use pulse_server::config::ServerConfig;
use pulse_server::routes;
use pulse_server::rpc;
use pulse_server::state::AppState;
use pulse_store::{NotifyingStore, Snapshotter, Store};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        error!(error = %e, "server failed");
        std::process::exit(1);
    }
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let mut store = pulse_store::open(&config.database_dsn).await?;

    // Snapshotting only makes sense for the in-memory store; the SQL
    // backing is durable on its own.
    let written = Arc::new(Notify::new());
    let mut snapshot_task = None;
    if config.database_dsn.is_empty() {
        if config.restore {
            match pulse_store::restore(store.as_ref(), &config.file_storage_path).await {
                Ok(()) => info!(path = %config.file_storage_path.display(), "restored snapshot"),
                Err(e) => warn!(error = %e, "snapshot restore failed, starting empty"),
            }
        }
        if config.store_interval.is_zero() {
            store = Arc::new(NotifyingStore::new(store, Arc::clone(&written)));
        }
        let snapshotter = Snapshotter::new(
            Arc::clone(&store),
            &config.file_storage_path,
            config.store_interval,
            Arc::clone(&written),
        );
        snapshot_task = Some(tokio::spawn(snapshotter.run(cancel.clone())));
    }

    let opener = match &config.crypto_key {
        Some(path) => Some(Opener::from_pem_file(path)?),
        None => None,
    };
    let state = AppState::new(Arc::clone(&store), Signer::new(&config.key), opener);

    let rpc_listener = tokio::net::TcpListener::bind(&config.rpc_address).await?;
    let rpc_task = tokio::spawn(rpc::serve(
        rpc_listener,
        Arc::clone(&store),
        cancel.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(&config.address).await?;
    info!(addr = %config.address, "listening");

    let app = routes::router(state);
    let shutdown = cancel.clone();
    let http_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
    });

    cancel.cancelled().await;

    // Give in-flight handlers a bounded window to drain, then let the
    // snapshotter write its final dump.
    match tokio::time::timeout(DRAIN_TIMEOUT, http_task).await {
        Ok(served) => served??,
        Err(_) => warn!("drain timeout expired, abandoning in-flight requests"),
    }
    if let Ok(joined) = rpc_task.await {
        joined?;
    }
    if let Some(task) = snapshot_task {
        let _ = task.await;
    }

    info!("server stopped");
    Ok(())
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
            let mut quit = match signal(SignalKind::quit()) {
                Ok(stream) => stream,
                Err(e) => {
                    error!(error = %e, "can not install SIGQUIT handler");
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
                _ = quit.recv() => {}
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
