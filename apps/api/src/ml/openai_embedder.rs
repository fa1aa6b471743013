use super::EmbeddingProvider;
use crate::config::Config;
use crate::services::outcome::{ProviderError, ProviderResult};
use async_trait::async_trait;
use log::{debug, info, warn};
use lru::LruCache;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

const DEFAULT_RETRY_DELAY_MS: u64 = 500;
const MAX_RETRY_DELAY_MS: u64 = 30_000;
const MAX_CACHE_ENTRIES: usize = 1000;

const CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(MAX_CACHE_ENTRIES) {
    Some(capacity) => capacity,
    None => panic!("embedding cache capacity must be non-zero"),
};

/// Embedding plus the moment it was fetched; repeated descriptions are common
/// within a session.
type CacheEntry = (Vec<f32>, Instant);

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embedding provider backed by the OpenAI `/embeddings` endpoint.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
    dimension: usize,
    max_retries: u32,
    cache: Arc<RwLock<LruCache<String, CacheEntry>>>,
    cache_ttl: Duration,
}

impl OpenAiEmbedder {
    pub fn new(config: &Config) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .build()
            .map_err(|e| {
                ProviderError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        if config.openai_api_key.is_none() {
            warn!("APP_OPENAI_API_KEY is not set; embeddings will be unavailable");
        }

        let dimension = dimension_for_model(&config.embedding_model);
        info!(
            "Initialized OpenAI embedder with model: {} ({} dimensions)",
            config.embedding_model, dimension
        );

        Ok(Self {
            client,
            api_key: config.openai_api_key.clone(),
            endpoint: format!(
                "{}/embeddings",
                config.openai_base_url.trim_end_matches('/')
            ),
            model: config.embedding_model.clone(),
            dimension,
            max_retries: config.external_service_retries.max(1),
            cache: Arc::new(RwLock::new(LruCache::new(CACHE_CAPACITY))),
            cache_ttl: config.embedding_cache_ttl(),
        })
    }

    fn cached(&self, text: &str) -> Option<Vec<f32>> {
        let mut cache = self.cache.write().ok()?;
        let ttl = self.cache_ttl;
        let entry = cache
            .get(text)
            .map(|(embedding, fetched_at)| (fetched_at.elapsed() < ttl).then(|| embedding.clone()));
        match entry {
            Some(Some(embedding)) => Some(embedding),
            Some(None) => {
                cache.pop(text);
                None
            }
            None => None,
        }
    }

    fn remember(&self, text: &str, embedding: &[f32]) {
        if let Ok(mut cache) = self.cache.write() {
            cache.put(text.to_string(), (embedding.to_vec(), Instant::now()));
        }
    }

    async fn request_embedding(&self, api_key: &str, text: &str) -> Result<Vec<f32>, Attempt> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| Attempt::Transient(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let error = ProviderError::ServiceUnavailable(format!(
                "OpenAI embedding error ({}): {}",
                status, error_text
            ));
            return Err(if is_transient(status) {
                Attempt::Transient(error)
            } else {
                Attempt::Permanent(error)
            });
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Attempt::Permanent(e.into()))?;
        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                Attempt::Permanent(ProviderError::ServiceUnavailable(
                    "OpenAI returned no embedding".to_string(),
                ))
            })
    }
}

/// A failed request, split by whether trying again could help.
enum Attempt {
    Transient(ProviderError),
    Permanent(ProviderError),
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Configuration("Missing OpenAI API key".to_string()))?;

        if let Some(embedding) = self.cached(text) {
            debug!("Embedding cache HIT ({} chars)", text.len());
            return Ok(embedding);
        }

        let mut attempt = 1;
        loop {
            match self.request_embedding(api_key, text).await {
                Ok(embedding) => {
                    self.remember(text, &embedding);
                    return Ok(embedding);
                }
                Err(Attempt::Transient(e)) if attempt < self.max_retries => {
                    let delay = retry_delay(attempt);
                    warn!(
                        "Embedding attempt {}/{} failed, retrying in {}ms: {}",
                        attempt,
                        self.max_retries,
                        delay.as_millis(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(Attempt::Transient(e)) | Err(Attempt::Permanent(e)) => return Err(e),
            }
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn dimension_for_model(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

/// Exponential backoff from `DEFAULT_RETRY_DELAY_MS`, capped at `MAX_RETRY_DELAY_MS`.
fn retry_delay(attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(
        DEFAULT_RETRY_DELAY_MS
            .saturating_mul(factor)
            .min(MAX_RETRY_DELAY_MS),
    )
}

// Rate limiting and server errors are worth another attempt; client errors are not.
fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
