//! Catalog search: prompt → keywords → Google Books → filtered [`Book`]s.

use crate::config::Config;
use crate::models::{Book, DiscoveryMode};
use crate::services::outcome::{Outcome, ProviderError, ProviderResult};
use crate::services::text_generation::{TextGenerator, KEYWORD_INSTRUCTION, KEYWORD_MAX_TOKENS};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "the", "a", "an", "of", "for", "to", "and", "in", "on", "with", "by", "about", "from",
        "at", "as", "is", "are", "was", "were", "be", "this", "that", "it", "you", "your", "my",
        "me", "i", "we", "us", "our", "they", "them", "their", "he", "she", "his", "her", "but",
        "or", "so", "if", "then", "than", "too", "very", "just", "can", "will", "would",
        "should", "could", "do", "does", "did", "have", "has", "had", "not", "no", "yes", "all",
        "any", "some", "more", "most", "many", "few", "which", "what", "who", "whom", "whose",
        "how", "when", "where", "why", "because", "while", "during", "after", "before", "over",
        "under", "again", "once", "here", "there", "out", "up", "down", "off", "above", "below",
        "into", "through", "between", "among", "each", "other", "such", "only", "own", "same",
        "want",
    ]
    .into()
});

const ENGLISH: &str = "en";

/// Remove stop words (case-insensitive) and keep the remaining words in order.
///
/// A prompt made only of stop words is returned trimmed rather than as an
/// empty query.
pub fn extract_keywords(prompt: &str) -> String {
    let keywords = prompt
        .split_whitespace()
        .filter(|word| !STOP_WORDS.contains(word.to_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ");

    if keywords.is_empty() {
        prompt.trim().to_string()
    } else {
        keywords
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumesResponse {
    #[serde(default)]
    pub items: Option<Vec<VolumeItem>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub volume_info: VolumeInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub authors: Option<Vec<String>>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub page_count: Option<i32>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub image_links: Option<ImageLinks>,
    #[serde(default)]
    pub industry_identifiers: Option<Vec<IndustryIdentifier>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLinks {
    #[serde(default)]
    pub small_thumbnail: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub small: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
    #[serde(default)]
    pub extra_large: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndustryIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub identifier: String,
}

impl VolumeInfo {
    fn identifier(&self, kind: &str) -> Option<String> {
        self.industry_identifiers
            .as_ref()?
            .iter()
            .find(|id| id.kind == kind)
            .map(|id| id.identifier.clone())
    }
}

/// Map a catalog item into a [`Book`].
///
/// The cover prefers the large variants and falls back to the thumbnail; the
/// thumbnail falls back to the cover. A book with neither has no images.
pub fn map_volume(item: &VolumeItem) -> Book {
    let info = &item.volume_info;
    let links = info.image_links.as_ref();
    let cover_image_url = links.and_then(|l| {
        l.large
            .clone()
            .or_else(|| l.extra_large.clone())
            .or_else(|| l.thumbnail.clone())
    });
    let thumbnail_url = links
        .and_then(|l| l.thumbnail.clone())
        .or_else(|| cover_image_url.clone());

    let mut book = Book::new(info.title.clone().unwrap_or_default())
        .with_authors(info.authors.clone());
    book.isbn_13 = info.identifier("ISBN_13").unwrap_or_default();
    book.isbn_10 = info.identifier("ISBN_10");
    book.google_books_id = item.id.clone();
    book.subtitle = info.subtitle.clone();
    book.genre = info.categories.as_ref().and_then(|c| c.first().cloned());
    book.categories = info.categories.clone();
    book.description = info.description.clone();
    book.page_count = info.page_count;
    book.published_date = info.published_date.clone();
    book.publisher = info.publisher.clone();
    book.average_rating = info.average_rating;
    book.thumbnail_url = thumbnail_url;
    book.cover_image_url = cover_image_url;
    book
}

/// Keep English items that have a cover image, mapped and truncated to `limit`.
pub fn select_books(items: &[VolumeItem], limit: usize) -> Vec<Book> {
    items
        .iter()
        .filter(|item| item.volume_info.language.as_deref() == Some(ENGLISH))
        .map(map_volume)
        .filter(|book| book.cover_image_url.is_some())
        .take(limit)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    pub keywords: String,
    pub max_results: usize,
}

/// Source of raw catalog items.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn search_volumes(&self, query: &CatalogQuery) -> ProviderResult<Vec<VolumeItem>>;
}

#[derive(Debug, Clone)]
pub struct GoogleBooksClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleBooksClient {
    pub fn new(config: &Config) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                ProviderError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.google_books_base_url.trim_end_matches('/').to_string(),
            api_key: config.google_books_api_key.clone(),
        })
    }
}

#[async_trait]
impl CatalogProvider for GoogleBooksClient {
    async fn search_volumes(&self, query: &CatalogQuery) -> ProviderResult<Vec<VolumeItem>> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ProviderError::Configuration("GOOGLE_BOOKS_API_KEY is not set".to_string())
        })?;

        let max_results = query.max_results.to_string();
        let response = self
            .client
            .get(format!("{}/volumes", self.base_url))
            .query(&[
                ("q", query.keywords.as_str()),
                ("maxResults", max_results.as_str()),
                ("orderBy", "relevance"),
                ("printType", "books"),
                ("key", api_key),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::ServiceUnavailable(format!(
                "Google Books API error: {}",
                status
            )));
        }

        let body: VolumesResponse = response.json().await?;
        Ok(body.items.unwrap_or_default())
    }
}

/// Turns a prompt into a short list of candidate books.
#[derive(Clone)]
pub struct CatalogSearch {
    provider: Arc<dyn CatalogProvider>,
    generator: Arc<dyn TextGenerator>,
    page_size: usize,
    result_limit: usize,
}

impl CatalogSearch {
    pub fn new(
        provider: Arc<dyn CatalogProvider>,
        generator: Arc<dyn TextGenerator>,
        page_size: usize,
        result_limit: usize,
    ) -> Self {
        Self {
            provider,
            generator,
            page_size,
            result_limit,
        }
    }

    pub fn result_limit(&self) -> usize {
        self.result_limit
    }

    /// Fresh mode uses stop-word filtering only. Smart mode asks the text
    /// generator first and silently falls back to stop-word filtering.
    pub async fn keywords(&self, prompt: &str, mode: DiscoveryMode) -> Outcome<String> {
        match mode {
            DiscoveryMode::Fresh => Outcome::Success(extract_keywords(prompt)),
            DiscoveryMode::Smart => {
                let outcome = Outcome::or_fallback(
                    self.generator
                        .complete(KEYWORD_INSTRUCTION, prompt, KEYWORD_MAX_TOKENS)
                        .await,
                    || extract_keywords(prompt),
                );
                if let Some(reason) = outcome.reason() {
                    warn!("AI keyword extraction unavailable, using stop-word filter: {}", reason);
                }
                outcome
            }
        }
    }

    /// Query the catalog with already extracted keywords.
    pub async fn fetch(&self, keywords: &str) -> Outcome<Vec<Book>> {
        let query = CatalogQuery {
            keywords: keywords.to_string(),
            max_results: self.page_size,
        };

        match self.provider.search_volumes(&query).await {
            Ok(items) => {
                let books = select_books(&items, self.result_limit);
                debug!(
                    "Catalog returned {} items, {} usable after filtering",
                    items.len(),
                    books.len()
                );
                Outcome::Success(books)
            }
            Err(e) => {
                warn!("Catalog fetch failed: {}", e);
                Outcome::Failure(e)
            }
        }
    }

    /// Keywords then fetch. Any failure yields an empty list.
    pub async fn search(&self, prompt: &str, mode: DiscoveryMode) -> Vec<Book> {
        let keywords = self
            .keywords(prompt, mode)
            .await
            .into_value()
            .unwrap_or_else(|| extract_keywords(prompt));
        info!("Searching catalog with {} keyword(s)", keywords.split_whitespace().count());

        self.fetch(&keywords).await.into_value().unwrap_or_default()
    }
}
