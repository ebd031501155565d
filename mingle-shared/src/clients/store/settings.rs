use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::{DocumentStore, FirestoreConfig, FirestoreStore, MemoryStore};

/// Document store selection, nested under each service's config as `store`.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_firestore_url")]
    pub firestore_url: String,
    #[serde(default = "default_project_id")]
    pub project_id: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_backend() -> String { "memory".into() }
fn default_firestore_url() -> String { "https://firestore.googleapis.com/v1".into() }
fn default_project_id() -> String { "mingle-dev".into() }
fn default_database() -> String { "(default)".into() }
fn default_poll_interval_ms() -> u64 { 2000 }

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            firestore_url: default_firestore_url(),
            project_id: default_project_id(),
            database: default_database(),
            access_token: None,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl StoreSettings {
    pub fn connect(&self) -> anyhow::Result<Arc<dyn DocumentStore>> {
        let store: Arc<dyn DocumentStore> = match self.backend.as_str() {
            "memory" => Arc::new(MemoryStore::new()),
            "firestore" => Arc::new(FirestoreStore::new(FirestoreConfig {
                base_url: self.firestore_url.clone(),
                project_id: self.project_id.clone(),
                database: self.database.clone(),
                access_token: self.access_token.clone(),
                poll_interval: Duration::from_millis(self.poll_interval_ms),
            })),
            other => anyhow::bail!("unknown store backend: {other}"),
        };
        tracing::info!(backend = store.backend_name(), "document store ready");
        Ok(store)
    }
}
