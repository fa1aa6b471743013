use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use book::{Book, BookIndexEntry};
pub use interaction::{Interaction, InteractionType, PromptEmbeddingRecord, UserProfile};
pub use tracking::{
    BatchReport, TrackInteractionRequest, TrackedAction, ViewportBatchRequest, ViewportEvent,
};

mod book;
mod interaction;
mod tracking;

/// Discovery mode requested by the caller.
///
/// Fresh mode keeps nothing about the request; Smart mode may persist a hash
/// of the prompt and uses the caller's interaction history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    #[serde(alias = "Fresh")]
    Fresh,
    #[serde(alias = "Smart")]
    Smart,
}

impl FromStr for DiscoveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fresh" => Ok(DiscoveryMode::Fresh),
            "smart" => Ok(DiscoveryMode::Smart),
            other => Err(format!("Unsupported mode '{}'", other)),
        }
    }
}

impl fmt::Display for DiscoveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryMode::Fresh => write!(f, "fresh"),
            DiscoveryMode::Smart => write!(f, "smart"),
        }
    }
}

/// Body of `POST /api/recommend`. Fields are validated by the handler so that a
/// missing prompt or unknown mode produces a readable 400.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// A validated recommendation request as seen by the pipeline.
#[derive(Debug, Clone)]
pub struct RecommendationQuery {
    pub prompt: String,
    pub mode: DiscoveryMode,
    pub user_id: Option<String>,
}

impl TryFrom<RecommendationRequest> for RecommendationQuery {
    type Error = String;

    fn try_from(request: RecommendationRequest) -> Result<Self, Self::Error> {
        let prompt = request
            .prompt
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| "Prompt required.".to_string())?;

        let mode = request
            .mode
            .as_deref()
            .ok_or_else(|| "Mode required.".to_string())?
            .parse::<DiscoveryMode>()?;

        let user_id = request
            .user_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        Ok(Self {
            prompt,
            mode,
            user_id,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub books: Vec<Book>,
    pub prompt_vector_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub themes_used: Option<String>,
}

impl RecommendationResponse {
    pub fn empty() -> Self {
        Self {
            books: Vec::new(),
            prompt_vector_available: false,
            themes_used: None,
        }
    }
}
