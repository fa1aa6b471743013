use super::{Book, DiscoveryMode, InteractionType};
use serde::{Deserialize, Serialize};

/// Explicit actions the UI can report, and how each is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedAction {
    AddToList,
    ShowMoreLike,
    HideSimilar,
    Clicked,
}

impl TrackedAction {
    /// Stored interaction type and signal strength for this action.
    pub fn signal(self) -> (InteractionType, f64) {
        match self {
            TrackedAction::AddToList => (InteractionType::Saved, 1.0),
            TrackedAction::ShowMoreLike => (InteractionType::Liked, 0.8),
            TrackedAction::HideSimilar => (InteractionType::Dismissed, -0.5),
            TrackedAction::Clicked => (InteractionType::Clicked, 0.1),
        }
    }
}

/// Body of `POST /api/track-interaction`.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackInteractionRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "bookId")]
    pub book_id: String,
    #[serde(rename = "interactionType")]
    pub interaction_type: TrackedAction,
    #[serde(rename = "bookData")]
    pub book_data: Book,
    #[serde(default)]
    pub position_in_results: Option<i32>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub discovery_context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewportEvent {
    #[serde(rename = "bookId")]
    pub book_id: String,
    #[serde(rename = "bookData")]
    pub book_data: Book,
    #[serde(default)]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub scroll_depth_percent: Option<f64>,
    #[serde(default)]
    pub position_in_results: Option<i32>,
}

/// Body of `POST /api/track-viewport-batch`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportBatchRequest {
    pub user_id: String,
    pub session_id: String,
    pub current_mode: DiscoveryMode,
    #[serde(default)]
    pub events: Vec<ViewportEvent>,
}

/// Outcome of a fan-out over independent items: failures never hide successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub processed_count: usize,
    pub failed_count: usize,
    pub total_count: usize,
}

impl BatchReport {
    pub fn from_results<T, E>(results: &[Result<T, E>]) -> Self {
        let failed_count = results.iter().filter(|r| r.is_err()).count();
        Self {
            processed_count: results.len() - failed_count,
            failed_count,
            total_count: results.len(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed_count == 0
    }
}
