use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

fn deserialize_optional_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrFloat {
        String(String),
        Float(f64),
        Null,
    }

    match StringOrFloat::deserialize(deserializer)? {
        StringOrFloat::String(s) => {
            if s.is_empty() {
                Ok(None)
            } else {
                f64::from_str(&s).map(Some).map_err(serde::de::Error::custom)
            }
        }
        StringOrFloat::Float(f) => Ok(Some(f)),
        StringOrFloat::Null => Ok(None),
    }
}

/// pgvector columns come back from PostgREST as `"[0.1,0.2,...]"`, while
/// rows written by hand or by older clients hold plain JSON arrays.
fn deserialize_embedding<'de, D>(deserializer: D) -> Result<Option<Vec<f32>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrVec {
        String(String),
        Vec(Vec<f32>),
        Null,
    }

    match StringOrVec::deserialize(deserializer)? {
        StringOrVec::String(s) => {
            let inner = s.trim().trim_start_matches('[').trim_end_matches(']');
            if inner.trim().is_empty() {
                return Ok(None);
            }
            inner
                .split(',')
                .map(|v| f32::from_str(v.trim()).map_err(serde::de::Error::custom))
                .collect::<Result<Vec<_>, _>>()
                .map(Some)
        }
        StringOrVec::Vec(v) if v.is_empty() => Ok(None),
        StringOrVec::Vec(v) => Ok(Some(v)),
        StringOrVec::Null => Ok(None),
    }
}

/// A book as returned to callers of the recommendation API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// ISBN-13, or an empty string when the catalog did not report one.
    #[serde(default)]
    pub isbn_13: String,
    #[serde(default)]
    pub isbn_10: Option<String>,
    #[serde(default)]
    pub google_books_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub authors: Option<Vec<String>>,
    #[serde(default)]
    pub primary_author: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
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
    #[serde(default, deserialize_with = "deserialize_optional_f64")]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
}

impl Book {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            isbn_13: String::new(),
            isbn_10: None,
            google_books_id: None,
            title: title.into(),
            subtitle: None,
            authors: None,
            primary_author: None,
            genre: None,
            categories: None,
            description: None,
            page_count: None,
            published_date: None,
            publisher: None,
            average_rating: None,
            thumbnail_url: None,
            cover_image_url: None,
        }
    }

    /// Set the author list; the primary author is always the first entry.
    pub fn with_authors(mut self, authors: Option<Vec<String>>) -> Self {
        let authors = authors.filter(|a| !a.is_empty());
        self.primary_author = authors.as_ref().and_then(|a| a.first().cloned());
        self.authors = authors;
        self
    }

    pub fn has_description(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }
}

/// A row of the `book_index` table: a [`Book`] plus the data used for scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookIndexEntry {
    #[serde(flatten)]
    pub book: Book,
    #[serde(default, deserialize_with = "deserialize_embedding")]
    pub content_embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_optional_f64")]
    pub quality_score: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_optional_f64")]
    pub popularity_score: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_available: Option<bool>,
}

impl From<Book> for BookIndexEntry {
    fn from(book: Book) -> Self {
        Self {
            book,
            content_embedding: None,
            tags: None,
            quality_score: None,
            popularity_score: None,
            created_at: None,
            updated_at: None,
            is_active: None,
            is_available: None,
        }
    }
}
