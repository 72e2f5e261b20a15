use hyperbloom::api;
use hyperbloom::config::Config;
use hyperbloom::flusher::FlushCoordinator;
use hyperbloom::storage::{DurableStore, MemoryStore, RedbStore, SummaryStore};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!(
            "Usage: {} [--bind <addr:port>] [--db <path>|:memory:] [--flush-interval-ms <ms>]",
            args[0]
        );
        eprintln!(
            "       [--expected-items <n>] [--fpp <p>] [--filter-bits <m>] [--hashes <k>]"
        );
        eprintln!("       [--precision <p>] [--seed <u64>] [--verbose]");
        eprintln!("Example: {} --bind 127.0.0.1:5000 --db /var/lib/hyperbloom.redb", args[0]);
        std::process::exit(0);
    }

    let config = Config::from_args(&args)?;

    tracing_subscriber::fmt()
        .with_max_level(if config.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    tracing::info!(
        "Sketch parameters: m={} k={} precision={}",
        config.sketch.filter_bits,
        config.sketch.hash_count,
        config.sketch.precision
    );

    // 1. Durable store:
    let durable: Arc<dyn DurableStore> = if config.uses_memory_store() {
        tracing::warn!("Using in-memory durable store; summaries will not survive a restart");
        Arc::new(MemoryStore::new())
    } else {
        tracing::info!("Opening durable store at {}", config.db_path.display());
        Arc::new(RedbStore::open(&config.db_path)?)
    };

    // 2. Warm start:
    let store = Arc::new(SummaryStore::new(config.sketch));
    store.restore_from(durable.as_ref()).await?;

    // 3. Flush coordinator (before serving):
    let flusher =
        FlushCoordinator::new(store.clone(), durable.clone(), config.flush_interval).spawn();

    // 4. HTTP server:
    let app = api::router(store.clone());
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    tracing::info!("HTTP server listening on {}", config.bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // 5. Drain: the coordinator must stop before the durable store is released.
    if let Err(e) = &served {
        tracing::error!("HTTP server failed: {}", e);
    }
    flusher.shutdown();
    let report = flusher.stopped().await?;
    tracing::info!(
        "Final flush: {} flushed, {} failed",
        report.flushed,
        report.failed
    );

    drop(durable);
    tracing::info!("Shutdown complete");

    served?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Encountered signal: SIGINT"),
        _ = terminate => tracing::info!("Encountered signal: SIGTERM"),
    }
}
