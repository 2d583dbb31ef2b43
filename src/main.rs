//! `doc-sync-server` entry point.
//!
//! Serves one shared JSON document over HTTP. Configuration comes from the
//! environment:
//!
//! - `DOC_SYNC_BIND`: listen address (default `127.0.0.1:8080`)
//! - `DOC_SYNC_DATA`: backing file path (default `doc-sync-data.json`)

use doc_sync::store::DocStore;
use std::env;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

fn env_str(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("doc-sync-server v{} starting", env!("CARGO_PKG_VERSION"));

    let data_path = env_str("DOC_SYNC_DATA", "doc-sync-data.json");
    let bind_addr = env_str("DOC_SYNC_BIND", "127.0.0.1:8080");

    let store = Arc::new(DocStore::open(&data_path));
    info!("document store at {}", store.path().display());

    let app = doc_sync::http::router(store);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("doc-sync-server listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("signal received, shutting down");
        })
        .await?;

    info!("doc-sync-server exiting cleanly");
    Ok(())
}
