use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::Client as S3Client;
use serde::Deserialize;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("upload failed: {0}")]
    Upload(String),
}

/// Object storage for post media and profile pictures.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `body` under `key` and return its public URL.
    async fn upload(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String, BlobError>;
}

/// Blob backend selection, nested under the service config as `blob`.
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_access_key")]
    pub access_key: String,
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

fn default_backend() -> String { "memory".into() }
fn default_endpoint() -> String { "http://localhost:9000".into() }
fn default_region() -> String { "us-east-1".into() }
fn default_access_key() -> String { "minioadmin".into() }
fn default_secret_key() -> String { "minioadmin".into() }
fn default_bucket() -> String { "mingle-media".into() }
fn default_public_url() -> String { "http://localhost:9000".into() }

impl Default for S3Config {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            endpoint: default_endpoint(),
            region: default_region(),
            access_key: default_access_key(),
            secret_key: default_secret_key(),
            bucket: default_bucket(),
            public_url: default_public_url(),
        }
    }
}

impl S3Config {
    pub async fn connect(&self) -> anyhow::Result<Arc<dyn BlobStorage>> {
        let blobs: Arc<dyn BlobStorage> = match self.backend.as_str() {
            "memory" => Arc::new(MemoryBlobStorage::new()),
            "s3" => Arc::new(BlobClient::new(self).await),
            other => anyhow::bail!("unknown blob backend: {other}"),
        };
        Ok(blobs)
    }
}

/// S3-compatible blob client.
#[derive(Clone)]
pub struct BlobClient {
    client: S3Client,
    bucket: String,
    public_url: String,
}

impl BlobClient {
    pub async fn new(config: &S3Config) -> Self {
        let credentials = Credentials::new(&config.access_key, &config.secret_key, None, None, "mingle");

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let client = S3Client::from_conf(s3_config);

        // Ensure bucket exists
        if let Err(e) = client.create_bucket().bucket(&config.bucket).send().await {
            tracing::debug!(error = %e, bucket = %config.bucket, "create_bucket skipped");
        }

        tracing::info!(endpoint = %config.endpoint, bucket = %config.bucket, "blob client initialized");

        Self {
            client,
            bucket: config.bucket.clone(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BlobStorage for BlobClient {
    async fn upload(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String, BlobError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body.into())
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| BlobError::Upload(e.to_string()))?;

        Ok(format!("{}/{}/{}", self.public_url, self.bucket, key))
    }
}

/// Keeps uploads in memory and hands out `memory://` URLs.
#[derive(Clone, Default)]
pub struct MemoryBlobStorage {
    objects: Arc<RwLock<HashMap<String, (String, Vec<u8>)>>>,
}

impl MemoryBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn object(&self, key: &str) -> Option<(String, Vec<u8>)> {
        self.objects.read().await.get(key).cloned()
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    async fn upload(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String, BlobError> {
        if body.is_empty() {
            return Err(BlobError::Upload("empty body".into()));
        }
        self.objects
            .write()
            .await
            .insert(key.to_string(), (content_type.to_string(), body));
        Ok(format!("memory://{key}"))
    }
}
