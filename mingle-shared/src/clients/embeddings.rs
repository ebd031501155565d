use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("embedding API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("no embedding API key configured")]
    Disabled,

    #[error("expected {expected} embeddings, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

/// Turns texts into fixed-length vectors, one per input, in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

#[derive(Clone)]
pub struct OpenAiEmbeddings {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddings {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api { status, body });
        }

        let mut parsed: EmbeddingResponse = response.json().await?;
        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: parsed.data.len(),
            });
        }
        parsed.data.sort_by_key(|d| d.index);

        tracing::debug!(count = texts.len(), model = %self.model, "embeddings fetched");
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Used when no API key is configured; every request fails, so similarity
/// falls back to zero vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledEmbeddings;

#[async_trait]
impl EmbeddingProvider for DisabledEmbeddings {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    /// Answers in reverse input order, dropping the last item when the
    /// first input is "short", and rejects requests without the test key.
    async fn fake_embeddings(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer test-key") {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "bad key" })));
        }
        assert_eq!(body["model"], DEFAULT_EMBEDDING_MODEL);

        let inputs: Vec<String> = serde_json::from_value(body["input"].clone()).unwrap();
        let mut data: Vec<Value> = inputs
            .iter()
            .enumerate()
            .map(|(i, text)| json!({ "object": "embedding", "index": i, "embedding": [text.len() as f32, i as f32] }))
            .collect();
        if inputs.first().map(String::as_str) == Some("short") {
            data.pop();
        }
        data.reverse();
        (StatusCode::OK, Json(json!({ "object": "list", "data": data, "model": DEFAULT_EMBEDDING_MODEL })))
    }

    async fn serve() -> String {
        let app = Router::new().route("/v1/embeddings", post(fake_embeddings));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1/")
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn vectors_come_back_in_input_order() {
        let client = OpenAiEmbeddings::new("test-key", DEFAULT_EMBEDDING_MODEL).with_base_url(&serve().await);
        let vectors = client.embed(&texts(&["a", "bbb", "cc"])).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![3.0, 1.0], vec![2.0, 2.0]]);
    }

    #[tokio::test]
    async fn short_response_is_a_count_mismatch() {
        let client = OpenAiEmbeddings::new("test-key", DEFAULT_EMBEDDING_MODEL).with_base_url(&serve().await);
        let err = client.embed(&texts(&["short", "b", "c"])).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::CountMismatch { expected: 3, actual: 2 }));
    }

    #[tokio::test]
    async fn api_errors_carry_status_and_body() {
        let client = OpenAiEmbeddings::new("wrong-key", DEFAULT_EMBEDDING_MODEL).with_base_url(&serve().await);
        match client.embed(&texts(&["a"])).await.unwrap_err() {
            EmbeddingError::Api { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("bad key"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_batch_skips_the_request() {
        let client = OpenAiEmbeddings::new("test-key", DEFAULT_EMBEDDING_MODEL).with_base_url("http://127.0.0.1:1");
        assert!(client.embed(&[]).await.unwrap().is_empty());
        assert!(matches!(DisabledEmbeddings.embed(&texts(&["a"])).await, Err(EmbeddingError::Disabled)));
    }
}
