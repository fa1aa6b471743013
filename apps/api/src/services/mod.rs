pub mod catalog;
pub mod outcome;
pub mod preferences;
pub mod recommendation;
pub mod scoring;
pub mod store;
pub mod supabase;
pub mod text_generation;
pub mod tracking;

#[cfg(test)]
pub(crate) mod testing;

// Re-export public types
pub use catalog::{CatalogProvider, CatalogSearch, GoogleBooksClient};
pub use outcome::{Outcome, ProviderError, ProviderResult};
pub use preferences::{analyze_preferences, UserPreferenceProfile};
pub use recommendation::RecommendationService;
pub use scoring::hybrid_score;
pub use store::{InteractionStore, UserProfileStore};
pub use supabase::SupabaseClient;
pub use text_generation::{OpenAiChat, TextGenerator};
pub use tracking::TrackingService;
