use crate::ml::{embedding_similarity, rank_descending, EmbeddingProvider};
use crate::models::{
    Book, BookIndexEntry, DiscoveryMode, PromptEmbeddingRecord, RecommendationQuery,
    RecommendationResponse,
};
use crate::services::catalog::CatalogSearch;
use crate::services::outcome::Outcome;
use crate::services::preferences::{analyze_preferences, is_qualifying};
use crate::services::scoring::hybrid_score;
use crate::services::store::InteractionStore;
use crate::services::text_generation::{TextGenerator, THEME_INSTRUCTION, THEME_MAX_TOKENS};
use chrono::Utc;
use futures::future::join_all;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s]").unwrap());

const LOCAL_THEME_MIN_LEN: usize = 4;
const LOCAL_THEME_COUNT: usize = 5;

/// Lowercase hex SHA-256 of the prompt. The only form in which a prompt is stored.
pub fn hash_prompt(prompt: &str) -> String {
    format!("{:x}", Sha256::digest(prompt.as_bytes()))
}

/// Up to five distinct words longer than three characters, in prompt order.
pub fn local_themes(prompt: &str) -> Option<String> {
    let cleaned = NON_ALPHANUMERIC.replace_all(&prompt.to_lowercase(), "").into_owned();
    let mut seen = HashSet::new();
    let themes: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|word| word.chars().count() >= LOCAL_THEME_MIN_LEN)
        .filter(|word| seen.insert(*word))
        .take(LOCAL_THEME_COUNT)
        .collect();

    if themes.is_empty() {
        None
    } else {
        Some(themes.join(", "))
    }
}

/// A candidate after base ranking, carrying the embedding computed for it.
struct RankedCandidate {
    book: Book,
    embedding: Option<Vec<f32>>,
}

/// Prompt in, ranked books out.
///
/// Fresh mode stops after the catalog fetch. Smart mode embeds the prompt and
/// the candidates, ranks by similarity and, for a user with history, re-ranks
/// by hybrid score. Provider failures degrade the response instead of failing
/// the request.
pub struct RecommendationService {
    catalog: CatalogSearch,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn InteractionStore>,
}

impl RecommendationService {
    pub fn new(
        catalog: CatalogSearch,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn InteractionStore>,
    ) -> Self {
        Self {
            catalog,
            embedder,
            generator,
            store,
        }
    }

    pub async fn recommend(&self, query: &RecommendationQuery) -> RecommendationResponse {
        match query.mode {
            DiscoveryMode::Fresh => self.recommend_fresh(&query.prompt).await,
            DiscoveryMode::Smart => {
                self.recommend_smart(&query.prompt, query.user_id.as_deref())
                    .await
            }
        }
    }

    async fn recommend_fresh(&self, prompt: &str) -> RecommendationResponse {
        info!("Fresh discovery request ({} chars)", prompt.len());
        let books = self.catalog.search(prompt, DiscoveryMode::Fresh).await;
        info!("Fresh discovery returned {} books", books.len());

        RecommendationResponse {
            books,
            prompt_vector_available: false,
            themes_used: None,
        }
    }

    async fn recommend_smart(&self, prompt: &str, user_id: Option<&str>) -> RecommendationResponse {
        info!(
            "Smart discovery request ({} chars, user: {})",
            prompt.len(),
            user_id.is_some()
        );

        let books = self.catalog.search(prompt, DiscoveryMode::Smart).await;
        if books.is_empty() {
            info!("No catalog candidates, skipping embeddings");
            return RecommendationResponse::empty();
        }

        let themes_used = self.themes(prompt).await.into_value().flatten();

        let prompt_embedding = match self.embedder.embed(prompt).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Prompt embedding unavailable, returning catalog order: {}", e);
                return RecommendationResponse {
                    books,
                    prompt_vector_available: false,
                    themes_used,
                };
            }
        };

        if prompt_embedding.len() != self.embedder.dimension() {
            warn!(
                "{} returned {} dimensions, expected {}; returning catalog order",
                self.embedder.model_name(),
                prompt_embedding.len(),
                self.embedder.dimension()
            );
            return RecommendationResponse {
                books,
                prompt_vector_available: false,
                themes_used,
            };
        }

        if let Some(user_id) = user_id {
            self.record_prompt(user_id, prompt, &prompt_embedding).await;
        }

        let ranked = self.rank_by_similarity(books, &prompt_embedding).await;

        let books = match user_id {
            Some(user_id) => match self.personalize(user_id, &ranked).await {
                Some(books) => books,
                None => ranked.into_iter().map(|c| c.book).collect(),
            },
            None => ranked.into_iter().map(|c| c.book).collect(),
        };

        RecommendationResponse {
            books,
            prompt_vector_available: true,
            themes_used,
        }
    }

    /// Themes from the text generator, or a local word extraction.
    async fn themes(&self, prompt: &str) -> Outcome<Option<String>> {
        let outcome = Outcome::or_fallback(
            self.generator
                .complete(THEME_INSTRUCTION, prompt, THEME_MAX_TOKENS)
                .await
                .map(Some),
            || local_themes(prompt),
        );
        if let Some(reason) = outcome.reason() {
            warn!("Theme extraction unavailable, using local themes: {}", reason);
        }
        outcome
    }

    async fn record_prompt(&self, user_id: &str, prompt: &str, embedding: &[f32]) {
        let record = PromptEmbeddingRecord {
            user_id: user_id.to_string(),
            prompt_hash: hash_prompt(prompt),
            embedding_vector: embedding.to_vec(),
        };
        if let Err(e) = self.store.store_prompt_embedding(&record).await {
            warn!("Failed to store prompt embedding: {}", e);
        }
    }

    /// Embed every described candidate concurrently, then sort by similarity
    /// to the prompt. Candidates without an embedding keep their place after
    /// every scored one.
    async fn rank_by_similarity(
        &self,
        books: Vec<Book>,
        prompt_embedding: &[f32],
    ) -> Vec<RankedCandidate> {
        let embeddings = join_all(books.iter().map(|book| self.embed_book(book))).await;

        let attempted = books.iter().filter(|b| b.has_description()).count();
        let embedded = embeddings.iter().filter(|e| e.is_some()).count();
        if embedded < attempted {
            warn!(
                "Book embeddings: {} of {} failed",
                attempted - embedded,
                attempted
            );
        }

        let scored = books
            .into_iter()
            .zip(embeddings)
            .map(|(book, embedding)| {
                let similarity = embedding_similarity(Some(prompt_embedding), embedding.as_deref());
                (RankedCandidate { book, embedding }, similarity.map(f64::from))
            })
            .collect();

        rank_descending(scored)
    }

    async fn embed_book(&self, book: &Book) -> Option<Vec<f32>> {
        let description = book.description.as_deref().filter(|_| book.has_description())?;
        match self.embedder.embed(description).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                debug!("Embedding failed for '{}': {}", book.title, e);
                None
            }
        }
    }

    /// Re-rank by hybrid score. `None` when the user has nothing to
    /// personalize with, in which case the base ranking stands untruncated.
    async fn personalize(&self, user_id: &str, ranked: &[RankedCandidate]) -> Option<Vec<Book>> {
        let interactions = match self.store.interactions_for_user(user_id).await {
            Ok(interactions) => interactions,
            Err(e) => {
                warn!("Could not load interaction history: {}", e);
                return None;
            }
        };

        if !interactions.iter().any(is_qualifying) {
            debug!("No qualifying interactions, keeping base ranking");
            return None;
        }

        let mut isbns: Vec<String> = interactions
            .iter()
            .map(|i| i.book_isbn.clone())
            .chain(ranked.iter().map(|c| c.book.isbn_13.clone()))
            .filter(|isbn| !isbn.is_empty())
            .collect();
        isbns.sort();
        isbns.dedup();

        let index: HashMap<String, BookIndexEntry> =
            match self.store.book_index_entries(&isbns).await {
                Ok(entries) => entries
                    .into_iter()
                    .map(|entry| (entry.book.isbn_13.clone(), entry))
                    .collect(),
                Err(e) => {
                    warn!("Book index enrichment unavailable: {}", e);
                    HashMap::new()
                }
            };

        let profile = analyze_preferences(&interactions, &index, Utc::now());
        if !profile.has_signal() {
            debug!("Preference profile is empty, keeping base ranking");
            return None;
        }

        let scored = ranked
            .iter()
            .map(|candidate| {
                let entry = enrich(candidate, index.get(&candidate.book.isbn_13));
                let score = hybrid_score(&entry, &profile);
                (candidate.book.clone(), Some(score))
            })
            .collect();

        let mut books = rank_descending(scored);
        books.truncate(self.catalog.result_limit());
        info!("Personalized ranking applied to {} candidates", ranked.len());
        Some(books)
    }
}

/// Scoring view of a candidate: stored tags and embedding when indexed, the
/// freshly computed embedding otherwise.
fn enrich(candidate: &RankedCandidate, stored: Option<&BookIndexEntry>) -> BookIndexEntry {
    let mut entry = BookIndexEntry::from(candidate.book.clone());
    if let Some(stored) = stored {
        entry.tags = stored.tags.clone();
        entry.content_embedding = stored.content_embedding.clone();
    }
    if entry.content_embedding.is_none() {
        entry.content_embedding = candidate.embedding.clone();
    }
    entry
}
