use crate::ml::embedding_similarity;
use crate::models::BookIndexEntry;
use crate::services::preferences::UserPreferenceProfile;

const LIKED_GENRE: f64 = 2.0;
const DISLIKED_GENRE: f64 = -2.0;
const LIKED_AUTHOR: f64 = 3.0;
const DISLIKED_AUTHOR: f64 = -2.0;
const LIKED_CATEGORY: f64 = 1.5;
const DISLIKED_CATEGORY: f64 = -2.0;
const LIKED_TAG: f64 = 1.0;
const DISLIKED_TAG: f64 = -2.0;
const TASTE_SIMILARITY: f64 = 4.0;

/// Fit of one candidate against one profile. Only comparable within a single
/// scoring pass.
///
/// A matching label earns a fixed bonus regardless of how much weight the
/// profile accumulated for it.
pub fn hybrid_score(candidate: &BookIndexEntry, profile: &UserPreferenceProfile) -> f64 {
    let book = &candidate.book;
    let mut score = 0.0;

    if let Some(genre) = book.genre.as_deref() {
        if profile.liked.genres.contains(genre) {
            score += LIKED_GENRE;
        }
        if profile.disliked.genres.contains(genre) {
            score += DISLIKED_GENRE;
        }
    }

    if let Some(author) = book.primary_author.as_deref() {
        if profile.liked.authors.contains(author) {
            score += LIKED_AUTHOR;
        }
        if profile.disliked.authors.contains(author) {
            score += DISLIKED_AUTHOR;
        }
    }

    for category in book.categories.iter().flatten() {
        if profile.liked.categories.contains(category) {
            score += LIKED_CATEGORY;
        }
        if profile.disliked.categories.contains(category) {
            score += DISLIKED_CATEGORY;
        }
    }

    for tag in candidate.tags.iter().flatten() {
        if profile.liked.tags.contains(tag) {
            score += LIKED_TAG;
        }
        if profile.disliked.tags.contains(tag) {
            score += DISLIKED_TAG;
        }
    }

    if let Some(similarity) = embedding_similarity(
        profile.taste_embedding.as_deref(),
        candidate.content_embedding.as_deref(),
    ) {
        score += TASTE_SIMILARITY * f64::from(similarity);
    }

    score
}
