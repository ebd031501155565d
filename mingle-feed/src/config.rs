use serde::Deserialize;

use mingle_shared::clients::embeddings::{DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL};
use mingle_shared::clients::store::StoreSettings;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub store: StoreSettings,

    // Embeddings
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    // Caches and candidate limits
    #[serde(default = "default_cache_capacity")]
    pub embedding_cache_capacity: usize,
    #[serde(default = "default_cache_capacity")]
    pub profile_cache_capacity: usize,
    #[serde(default = "default_post_candidate_limit")]
    pub post_candidate_limit: usize,
    #[serde(default = "default_user_candidate_limit")]
    pub user_candidate_limit: usize,
}

fn default_port() -> u16 { 3012 }
fn default_embedding_model() -> String { DEFAULT_EMBEDDING_MODEL.into() }
fn default_embedding_dimensions() -> usize { DEFAULT_EMBEDDING_DIMENSIONS }
fn default_cache_capacity() -> usize { 1000 }
fn default_post_candidate_limit() -> usize { 100 }
fn default_user_candidate_limit() -> usize { 500 }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            store: StoreSettings::default(),
            openai_api_key: None,
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            embedding_cache_capacity: default_cache_capacity(),
            profile_cache_capacity: default_cache_capacity(),
            post_candidate_limit: default_post_candidate_limit(),
            user_candidate_limit: default_user_candidate_limit(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("MINGLE_FEED").separator("__"))
            .build()?;
        Ok(config.try_deserialize().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid MINGLE_FEED configuration, using defaults");
            Self::default()
        }))
    }
}
