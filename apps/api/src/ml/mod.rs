//! Embedding generation and vector similarity.

pub mod openai_embedder;
pub mod similarity;

pub use openai_embedder::OpenAiEmbedder;
pub use similarity::{cosine_similarity, embedding_similarity, rank_descending};

use crate::services::outcome::ProviderResult;
use async_trait::async_trait;

/// Turns text into a fixed-dimension vector.
///
/// Implementations report a missing credential as
/// `ProviderError::Configuration` and every transport or payload problem as
/// `ProviderError::ServiceUnavailable`. Callers treat both as recoverable.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>>;

    /// Number of dimensions in the vectors this provider returns.
    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}
