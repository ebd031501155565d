use std::sync::Arc;

use mingle_shared::clients::embeddings::{DisabledEmbeddings, EmbeddingProvider, OpenAiEmbeddings};

use mingle_feed::config::AppConfig;
use mingle_feed::recommend::Recommender;
use mingle_feed::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mingle_shared::middleware::init_tracing("mingle-feed");

    let config = AppConfig::load()?;
    let port = config.port;

    let store = config.store.connect()?;

    let embeddings: Arc<dyn EmbeddingProvider> = match &config.openai_api_key {
        Some(key) if !key.is_empty() => Arc::new(OpenAiEmbeddings::new(key, &config.embedding_model)),
        _ => {
            tracing::warn!("no OpenAI API key configured, text similarity disabled");
            Arc::new(DisabledEmbeddings)
        }
    };

    let recommender = Recommender::new(store.clone(), embeddings, &config);
    let metrics_handle = mingle_shared::middleware::init_metrics()?;

    let state = Arc::new(AppState {
        config,
        store,
        recommender,
        metrics_handle: Some(metrics_handle),
    });

    let app = mingle_feed::router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "mingle-feed starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
