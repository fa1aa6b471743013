use super::Book;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of action a user took on a book.
///
/// Anything the store holds that is not in this vocabulary parses as
/// [`InteractionType::Unknown`] and is ignored by preference analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    AddToList,
    ShowMoreLike,
    HideSimilar,
    Viewed,
    Clicked,
    Saved,
    Liked,
    Dismissed,
    Removed,
    RatingGiven,
    DetailsViewed,
    #[serde(other)]
    Unknown,
}

impl InteractionType {
    pub fn is_trackable(self) -> bool {
        !matches!(self, InteractionType::Unknown)
    }
}

/// One observed user action against one book, as stored in `user_interactions`.
///
/// Genre, author and categories are copied from the book when the interaction is
/// recorded so that preference analysis never has to join against the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    pub interaction_type: InteractionType,
    pub book_isbn: String,
    #[serde(default)]
    pub book_title: Option<String>,
    #[serde(default)]
    pub book_author: Option<String>,
    #[serde(default)]
    pub book_genre: Option<String>,
    #[serde(default)]
    pub book_categories: Option<Vec<String>>,
    /// Positive is affinity, negative is aversion. Zero (or missing) is ignored.
    #[serde(default)]
    pub signal_strength: Option<f64>,
    #[serde(default)]
    pub position_in_results: Option<i32>,
    #[serde(default)]
    pub view_duration_ms: Option<i64>,
    #[serde(default)]
    pub scroll_depth_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_context: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Interaction {
    /// Record a new interaction, snapshotting the book's descriptive fields.
    pub fn record(
        user_id: impl Into<String>,
        interaction_type: InteractionType,
        signal_strength: f64,
        book_isbn: impl Into<String>,
        book: &Book,
    ) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            session_id: None,
            interaction_type,
            book_isbn: book_isbn.into(),
            book_title: Some(book.title.clone()),
            book_author: book.primary_author.clone(),
            book_genre: book.genre.clone(),
            book_categories: book.categories.clone(),
            signal_strength: Some(signal_strength),
            position_in_results: None,
            view_duration_ms: None,
            scroll_depth_percent: None,
            discovery_context: None,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    pub fn signal(&self) -> f64 {
        self.signal_strength.unwrap_or(0.0)
    }
}

/// Per-user consent and mode flags from `user_profiles`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub smart_mode_enabled: Option<bool>,
    #[serde(default)]
    pub preferred_discovery_mode: Option<String>,
}

/// Row written to `smart_prompt_embeddings`. Only the hash of the prompt is kept.
#[derive(Debug, Clone, Serialize)]
pub struct PromptEmbeddingRecord {
    pub user_id: String,
    pub prompt_hash: String,
    pub embedding_vector: Vec<f32>,
}
