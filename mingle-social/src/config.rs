use serde::Deserialize;

use mingle_shared::clients::blob::S3Config;
use mingle_shared::clients::store::StoreSettings;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub blob: S3Config,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_port() -> u16 { 3011 }
fn default_max_upload_bytes() -> usize { 50 * 1024 * 1024 }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            store: StoreSettings::default(),
            blob: S3Config::default(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("MINGLE_SOCIAL").separator("__"))
            .build()?;
        Ok(config.try_deserialize().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid MINGLE_SOCIAL configuration, using defaults");
            Self::default()
        }))
    }
}
