//! In-memory collaborators for service tests.

use crate::ml::EmbeddingProvider;
use crate::models::{Book, BookIndexEntry, Interaction, PromptEmbeddingRecord, UserProfile};
use crate::services::catalog::{CatalogProvider, CatalogQuery, VolumeItem};
use crate::services::outcome::{ProviderError, ProviderResult};
use crate::services::store::{InteractionStore, UserProfileStore};
use crate::services::text_generation::TextGenerator;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

fn unavailable(what: &str) -> ProviderError {
    ProviderError::ServiceUnavailable(format!("{} unavailable", what))
}

pub struct FakeCatalog {
    items: Option<Vec<VolumeItem>>,
    queries: Mutex<Vec<CatalogQuery>>,
}

impl FakeCatalog {
    pub fn with_items(items: Vec<VolumeItem>) -> Self {
        Self {
            items: Some(items),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            items: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<CatalogQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogProvider for FakeCatalog {
    async fn search_volumes(&self, query: &CatalogQuery) -> ProviderResult<Vec<VolumeItem>> {
        self.queries.lock().unwrap().push(query.clone());
        self.items.clone().ok_or_else(|| unavailable("catalog"))
    }
}

pub struct FakeGenerator {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl FakeGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn complete(&self, _instruction: &str, _message: &str, _max_tokens: u32) -> ProviderResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().ok_or_else(|| unavailable("text generation"))
    }
}

/// Returns a fixed vector per text. Unknown texts get `default`, if set.
pub struct FakeEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    default: Option<Vec<f32>>,
    dimension: Option<usize>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self {
            vectors: HashMap::new(),
            default: None,
            dimension: None,
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn with_default(mut self, vector: Vec<f32>) -> Self {
        self.default = Some(vector);
        self
    }

    /// Advertise a fixed dimension regardless of the stored vectors.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.failing.contains(text) {
            return Err(unavailable("embedding"));
        }
        self.vectors
            .get(text)
            .or(self.default.as_ref())
            .cloned()
            .ok_or_else(|| unavailable("embedding"))
    }

    fn dimension(&self) -> usize {
        self.dimension.unwrap_or_else(|| {
            self.default
                .as_ref()
                .or_else(|| self.vectors.values().next())
                .map_or(0, Vec::len)
        })
    }

    fn model_name(&self) -> &str {
        "fake-embedder"
    }
}

/// Store backed by plain vectors. Writes can be made to fail per ISBN.
#[derive(Default)]
pub struct InMemoryStore {
    pub interactions: Mutex<Vec<Interaction>>,
    pub books: Mutex<Vec<BookIndexEntry>>,
    pub prompt_embeddings: Mutex<Vec<PromptEmbeddingRecord>>,
    pub profiles: Mutex<Vec<UserProfile>>,
    failing_isbns: HashSet<String>,
    unavailable: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interaction(self, interaction: Interaction) -> Self {
        self.interactions.lock().unwrap().push(interaction);
        self
    }

    pub fn with_entry(self, entry: BookIndexEntry) -> Self {
        self.books.lock().unwrap().push(entry);
        self
    }

    pub fn with_profile(self, profile: UserProfile) -> Self {
        self.profiles.lock().unwrap().push(profile);
        self
    }

    pub fn failing_for(mut self, isbn: &str) -> Self {
        self.failing_isbns.insert(isbn.to_string());
        self
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn logged(&self) -> Vec<Interaction> {
        self.interactions.lock().unwrap().clone()
    }

    pub fn prompt_records(&self) -> Vec<PromptEmbeddingRecord> {
        self.prompt_embeddings.lock().unwrap().clone()
    }

    pub fn indexed_isbns(&self) -> Vec<String> {
        self.books
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.book.isbn_13.clone())
            .collect()
    }

    fn check(&self) -> ProviderResult<()> {
        if self.unavailable {
            Err(unavailable("store"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl InteractionStore for InMemoryStore {
    async fn log_interaction(&self, interaction: &Interaction) -> ProviderResult<()> {
        self.check()?;
        if self.failing_isbns.contains(&interaction.book_isbn) {
            return Err(unavailable("store"));
        }
        self.interactions.lock().unwrap().push(interaction.clone());
        Ok(())
    }

    async fn interactions_for_user(&self, user_id: &str) -> ProviderResult<Vec<Interaction>> {
        self.check()?;
        Ok(self
            .interactions
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.user_id == user_id && i.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn book_index_entries(&self, isbns: &[String]) -> ProviderResult<Vec<BookIndexEntry>> {
        self.check()?;
        Ok(self
            .books
            .lock()
            .unwrap()
            .iter()
            .filter(|e| isbns.contains(&e.book.isbn_13))
            .cloned()
            .collect())
    }

    async fn book_exists(&self, isbn: &str) -> ProviderResult<bool> {
        self.check()?;
        Ok(self
            .books
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.book.isbn_13 == isbn))
    }

    async fn upsert_book(&self, book: &Book) -> ProviderResult<()> {
        self.check()?;
        let mut books = self.books.lock().unwrap();
        books.retain(|e| e.book.isbn_13 != book.isbn_13);
        books.push(BookIndexEntry::from(book.clone()));
        Ok(())
    }

    async fn store_prompt_embedding(&self, record: &PromptEmbeddingRecord) -> ProviderResult<()> {
        self.check()?;
        self.prompt_embeddings.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl UserProfileStore for InMemoryStore {
    async fn user_profile(&self, user_id: &str) -> ProviderResult<Option<UserProfile>> {
        self.check()?;
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == user_id)
            .cloned())
    }
}
