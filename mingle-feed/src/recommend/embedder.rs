use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use tokio::sync::Mutex;

use mingle_shared::clients::embeddings::EmbeddingProvider;

use super::cache::EmbeddingCache;
use super::similarity::{cosine, NEUTRAL_SIMILARITY};

/// Embedding lookups through a bounded cache. The cache lock is held across
/// the provider call, so concurrent callers never fetch the same text twice.
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    cache: Mutex<EmbeddingCache>,
    dimensions: usize,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, capacity: usize, dimensions: usize) -> Self {
        Self {
            provider,
            cache: Mutex::new(EmbeddingCache::new(capacity)),
            dimensions,
        }
    }

    fn zero(&self) -> Vec<f32> {
        vec![0.0; self.dimensions]
    }

    /// One vector per input text. Blank texts and failed requests yield
    /// zero vectors; a failure is logged and never cached.
    pub async fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        let mut cache = self.cache.lock().await;

        let wanted: Vec<&String> = texts.iter().filter(|t| !t.trim().is_empty()).collect();
        let missing = cache.missing(wanted);

        let mut fetched: HashMap<String, Vec<f32>> = HashMap::new();
        if !missing.is_empty() {
            match self.provider.embed(&missing).await {
                Ok(vectors) => {
                    counter!("mingle_embedding_texts_fetched_total").increment(missing.len() as u64);
                    let pairs: Vec<(String, Vec<f32>)> = missing.into_iter().zip(vectors).collect();
                    cache.insert_batch(pairs.clone());
                    fetched.extend(pairs);
                }
                Err(e) => {
                    counter!("mingle_embedding_failures_total").increment(1);
                    tracing::warn!(error = %e, count = missing.len(), "embedding request failed, using zero vectors");
                    return texts.iter().map(|_| self.zero()).collect();
                }
            }
        }

        texts
            .iter()
            .map(|t| {
                fetched
                    .get(t)
                    .or_else(|| cache.get(t))
                    .cloned()
                    .unwrap_or_else(|| self.zero())
            })
            .collect()
    }

    /// Fetch every uncached text in a single request.
    pub async fn warm(&self, texts: Vec<String>) {
        if !texts.is_empty() {
            self.embed_batch(&texts).await;
        }
    }

    /// Cosine similarity of two texts, or the neutral 0.5 if either is empty.
    pub async fn similarity(&self, a: &str, b: &str) -> f64 {
        if a.trim().is_empty() || b.trim().is_empty() {
            return NEUTRAL_SIMILARITY;
        }
        let vectors = self.embed_batch(&[a.to_string(), b.to_string()]).await;
        cosine(&vectors[0], &vectors[1])
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.lock().await.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use mingle_shared::clients::embeddings::EmbeddingError;
    use std::sync::Mutex as StdMutex;

    /// Deterministic provider: each text maps to a vector derived from its
    /// bytes. Records every requested batch.
    #[derive(Default)]
    pub(crate) struct StubProvider {
        pub calls: StdMutex<Vec<Vec<String>>>,
        pub fail: bool,
    }

    pub(crate) fn stub_vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; 4];
        for (i, b) in text.bytes().enumerate() {
            v[i % 4] += b as f32;
        }
        v
    }

    #[async_trait]
    impl EmbeddingProvider for StubProvider {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.lock().unwrap().push(texts.to_vec());
            if self.fail {
                return Err(EmbeddingError::Disabled);
            }
            Ok(texts.iter().map(|t| stub_vector(t)).collect())
        }
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn cached_texts_are_never_requested_again() {
        let provider = Arc::new(StubProvider::default());
        let embedder = Embedder::new(provider.clone(), 10, 4);

        embedder.embed_batch(&texts(&["a", "b", "a"])).await;
        embedder.embed_batch(&texts(&["b", "c"])).await;
        embedder.embed_batch(&texts(&["a", "c"])).await;

        let calls = provider.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![texts(&["a", "b"]), texts(&["c"])]);
    }

    #[tokio::test]
    async fn cache_stays_within_capacity() {
        let provider = Arc::new(StubProvider::default());
        let embedder = Embedder::new(provider, 3, 4);
        for i in 0..10 {
            embedder
                .embed_batch(&[format!("x{i}"), format!("y{i}")])
                .await;
            assert!(embedder.cached_len().await <= 3);
        }
    }

    #[tokio::test]
    async fn failure_yields_zero_vectors_of_configured_dimension() {
        let provider = Arc::new(StubProvider {
            fail: true,
            ..StubProvider::default()
        });
        let embedder = Embedder::new(provider, 10, 1536);
        let vectors = embedder.embed_batch(&texts(&["a", "b"])).await;
        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|v| v.len() == 1536 && v.iter().all(|x| *x == 0.0)));
        assert_eq!(embedder.cached_len().await, 0);
        assert_eq!(embedder.similarity("a", "b").await, 0.0);
    }

    #[tokio::test]
    async fn empty_text_gives_neutral_similarity_without_a_request() {
        let provider = Arc::new(StubProvider::default());
        let embedder = Embedder::new(provider.clone(), 10, 4);
        assert_eq!(embedder.similarity("", "hello").await, NEUTRAL_SIMILARITY);
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn identical_texts_are_fully_similar() {
        let embedder = Embedder::new(Arc::new(StubProvider::default()), 10, 4);
        let s = embedder.similarity("summer tour", "summer tour").await;
        assert!((s - 1.0).abs() < 1e-9);
    }
}
