use std::sync::Arc;

use mingle_social::config::AppConfig;
use mingle_social::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mingle_shared::middleware::init_tracing("mingle-social");

    let config = AppConfig::load()?;
    let port = config.port;

    let store = config.store.connect()?;
    let blobs = config.blob.connect().await?;
    let metrics_handle = mingle_shared::middleware::init_metrics()?;

    let state = Arc::new(AppState {
        config,
        store,
        blobs,
        metrics_handle: Some(metrics_handle),
    });

    let app = mingle_social::router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "mingle-social starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
