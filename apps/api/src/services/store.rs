//! Persistence seams used by the recommendation and tracking services.

use crate::models::{Book, BookIndexEntry, Interaction, PromptEmbeddingRecord, UserProfile};
use crate::services::outcome::ProviderResult;
use async_trait::async_trait;

/// Append-mostly store of interactions plus the book index they refer to.
#[async_trait]
pub trait InteractionStore: Send + Sync {
    async fn log_interaction(&self, interaction: &Interaction) -> ProviderResult<()>;

    /// Every interaction for one user that has not been soft-deleted.
    async fn interactions_for_user(&self, user_id: &str) -> ProviderResult<Vec<Interaction>>;

    async fn book_index_entries(&self, isbns: &[String]) -> ProviderResult<Vec<BookIndexEntry>>;

    async fn book_exists(&self, isbn: &str) -> ProviderResult<bool>;

    async fn upsert_book(&self, book: &Book) -> ProviderResult<()>;

    async fn store_prompt_embedding(&self, record: &PromptEmbeddingRecord) -> ProviderResult<()>;
}

#[async_trait]
pub trait UserProfileStore: Send + Sync {
    async fn user_profile(&self, user_id: &str) -> ProviderResult<Option<UserProfile>>;
}
