//! Aggregates a user's interaction history into weighted label preferences
//! and a taste embedding.

use crate::models::{BookIndexEntry, Interaction};
use chrono::{DateTime, Duration, Utc};
use ndarray::{Array1, ArrayView1};
use std::collections::HashMap;

const RECENCY_WINDOW_DAYS: i64 = 30;
const RECENT_MULTIPLIER: f64 = 2.0;

/// Label to accumulated weight. Built once per analysis and never mutated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceMap {
    weights: HashMap<String, f64>,
}

impl PreferenceMap {
    pub fn weight(&self, label: &str) -> f64 {
        self.weights.get(label).copied().unwrap_or(0.0)
    }

    /// True when the label has any non-zero accumulated weight.
    pub fn contains(&self, label: &str) -> bool {
        self.weight(label) != 0.0
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(label, weight)| (label.as_str(), *weight))
    }
}

#[derive(Debug, Default)]
struct MapBuilder {
    weights: HashMap<String, f64>,
}

impl MapBuilder {
    fn add(&mut self, label: &str, weight: f64) {
        let label = label.trim();
        if label.is_empty() {
            return;
        }
        *self.weights.entry(label.to_string()).or_insert(0.0) += weight;
    }

    fn build(self) -> PreferenceMap {
        PreferenceMap {
            weights: self.weights,
        }
    }
}

/// One side (liked or disliked) of a preference profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelPreferences {
    pub genres: PreferenceMap,
    pub authors: PreferenceMap,
    pub categories: PreferenceMap,
    pub tags: PreferenceMap,
}

impl LabelPreferences {
    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
            && self.authors.is_empty()
            && self.categories.is_empty()
            && self.tags.is_empty()
    }
}

#[derive(Debug, Default)]
struct LabelBuilder {
    genres: MapBuilder,
    authors: MapBuilder,
    categories: MapBuilder,
    tags: MapBuilder,
}

impl LabelBuilder {
    fn build(self) -> LabelPreferences {
        LabelPreferences {
            genres: self.genres.build(),
            authors: self.authors.build(),
            categories: self.categories.build(),
            tags: self.tags.build(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPreferenceProfile {
    pub liked: LabelPreferences,
    pub disliked: LabelPreferences,
    /// Mean content embedding of positively signaled books. `None` when no
    /// such book had a stored embedding.
    pub taste_embedding: Option<Vec<f32>>,
}

impl UserPreferenceProfile {
    /// Whether the profile can influence scoring at all.
    pub fn has_signal(&self) -> bool {
        !self.liked.is_empty() || !self.disliked.is_empty() || self.taste_embedding.is_some()
    }
}

fn recency_multiplier(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    if now - created_at < Duration::days(RECENCY_WINDOW_DAYS) {
        RECENT_MULTIPLIER
    } else {
        1.0
    }
}

/// An interaction the analyzer counts: known type and a non-zero signal.
pub fn is_qualifying(interaction: &Interaction) -> bool {
    let signal = interaction.signal();
    interaction.interaction_type.is_trackable() && signal != 0.0 && signal.is_finite()
}

/// Build a preference profile from interaction history.
///
/// `enrichment` maps ISBN-13 to the book index row for that book and supplies
/// tags and content embeddings.
pub fn analyze_preferences(
    interactions: &[Interaction],
    enrichment: &HashMap<String, BookIndexEntry>,
    now: DateTime<Utc>,
) -> UserPreferenceProfile {
    let mut liked = LabelBuilder::default();
    let mut disliked = LabelBuilder::default();
    let mut embeddings: Vec<&[f32]> = Vec::new();

    for interaction in interactions.iter().filter(|i| is_qualifying(i)) {
        let signal = interaction.signal();
        let weight = signal.abs() * recency_multiplier(interaction.created_at, now);
        let side = if signal > 0.0 { &mut liked } else { &mut disliked };
        let entry = enrichment.get(&interaction.book_isbn);

        if let Some(genre) = &interaction.book_genre {
            side.genres.add(genre, weight);
        }
        if let Some(author) = &interaction.book_author {
            side.authors.add(author, weight);
        }
        for category in interaction.book_categories.iter().flatten() {
            side.categories.add(category, weight);
        }
        for tag in entry.and_then(|e| e.tags.as_ref()).into_iter().flatten() {
            side.tags.add(tag, weight);
        }

        if signal > 0.0 {
            if let Some(embedding) = entry.and_then(|e| e.content_embedding.as_deref()) {
                embeddings.push(embedding);
            }
        }
    }

    UserPreferenceProfile {
        liked: liked.build(),
        disliked: disliked.build(),
        taste_embedding: mean_embedding(&embeddings),
    }
}

/// Coordinate-wise mean. Vectors whose length differs from the first
/// non-empty vector are skipped.
fn mean_embedding(embeddings: &[&[f32]]) -> Option<Vec<f32>> {
    let dimension = embeddings.iter().map(|e| e.len()).find(|len| *len > 0)?;

    let mut sum = Array1::<f32>::zeros(dimension);
    let mut count = 0usize;
    for embedding in embeddings.iter().filter(|e| e.len() == dimension) {
        sum += &ArrayView1::from(*embedding);
        count += 1;
    }

    Some((sum / count as f32).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Book, InteractionType};
    use approx::assert_relative_eq;

    fn interaction(kind: InteractionType, signal: f64, genre: &str, age_days: i64) -> Interaction {
        let mut book = Book::new("A Book").with_authors(Some(vec!["Ann Author".to_string()]));
        book.genre = Some(genre.to_string());
        let mut interaction = Interaction::record("user-1", kind, signal, "9780000000001", &book);
        interaction.created_at = Utc::now() - Duration::days(age_days);
        interaction
    }

    fn entry(isbn: &str, tags: &[&str], embedding: Option<Vec<f32>>) -> BookIndexEntry {
        let mut book = Book::new("Indexed");
        book.isbn_13 = isbn.to_string();
        let mut entry = BookIndexEntry::from(book);
        entry.tags = Some(tags.iter().map(|t| t.to_string()).collect());
        entry.content_embedding = embedding;
        entry
    }

    #[test]
    fn test_recent_saved_interaction_doubles_weight() {
        let history = vec![interaction(InteractionType::Saved, 1.0, "Fantasy", 0)];
        let profile = analyze_preferences(&history, &HashMap::new(), Utc::now());

        assert_eq!(profile.liked.genres.len(), 1);
        assert_eq!(profile.liked.genres.weight("Fantasy"), 2.0);
        assert!(profile.disliked.genres.is_empty());
        assert_eq!(profile.liked.authors.weight("Ann Author"), 2.0);
    }

    #[test]
    fn test_zero_signal_is_excluded() {
        let history = vec![
            interaction(InteractionType::Viewed, 0.0, "Fantasy", 1),
            interaction(InteractionType::Saved, 0.0, "Horror", 1),
        ];
        let enrichment = HashMap::from([(
            "9780000000001".to_string(),
            entry("9780000000001", &["cozy"], Some(vec![1.0, 0.0])),
        )]);

        let profile = analyze_preferences(&history, &enrichment, Utc::now());
        assert_eq!(profile, UserPreferenceProfile::default());
        assert!(!profile.has_signal());
    }

    #[test]
    fn test_old_interactions_weigh_half_of_recent_ones() {
        let recent = analyze_preferences(
            &[interaction(InteractionType::Liked, 0.8, "Mystery", 10)],
            &HashMap::new(),
            Utc::now(),
        );
        let old = analyze_preferences(
            &[interaction(InteractionType::Liked, 0.8, "Mystery", 40)],
            &HashMap::new(),
            Utc::now(),
        );

        assert_relative_eq!(
            recent.liked.genres.weight("Mystery"),
            2.0 * old.liked.genres.weight("Mystery")
        );
    }

    #[test]
    fn test_negative_signal_goes_to_disliked() {
        let history = vec![
            interaction(InteractionType::Dismissed, -0.5, "Horror", 60),
            interaction(InteractionType::Dismissed, -0.5, "Horror", 60),
        ];
        let profile = analyze_preferences(&history, &HashMap::new(), Utc::now());

        assert!(profile.liked.is_empty());
        assert_relative_eq!(profile.disliked.genres.weight("Horror"), 1.0);
    }

    #[test]
    fn test_unknown_types_are_skipped() {
        let history = vec![interaction(InteractionType::Unknown, 1.0, "Fantasy", 0)];
        let profile = analyze_preferences(&history, &HashMap::new(), Utc::now());
        assert!(!profile.has_signal());
    }

    #[test]
    fn test_categories_and_tags_each_contribute() {
        let mut saved = interaction(InteractionType::Saved, 1.0, "Fantasy", 50);
        saved.book_categories = Some(vec!["Fiction".to_string(), "Dragons".to_string()]);
        let enrichment = HashMap::from([(
            saved.book_isbn.clone(),
            entry(&saved.book_isbn, &["cozy", "found family"], None),
        )]);

        let profile = analyze_preferences(&[saved], &enrichment, Utc::now());

        assert_eq!(profile.liked.categories.weight("Fiction"), 1.0);
        assert_eq!(profile.liked.categories.weight("Dragons"), 1.0);
        assert_eq!(profile.liked.tags.weight("found family"), 1.0);
        assert_eq!(profile.taste_embedding, None);
    }

    #[test]
    fn test_taste_embedding_is_mean_of_positive_books() {
        let mut first = interaction(InteractionType::Saved, 1.0, "Fantasy", 1);
        first.book_isbn = "A".to_string();
        let mut second = interaction(InteractionType::Liked, 0.8, "Fantasy", 1);
        second.book_isbn = "B".to_string();
        let mut disliked = interaction(InteractionType::Dismissed, -0.5, "Horror", 1);
        disliked.book_isbn = "C".to_string();

        let enrichment = HashMap::from([
            ("A".to_string(), entry("A", &[], Some(vec![1.0, 0.0]))),
            ("B".to_string(), entry("B", &[], Some(vec![0.0, 1.0]))),
            ("C".to_string(), entry("C", &[], Some(vec![9.0, 9.0]))),
        ]);

        let profile = analyze_preferences(&[first, second, disliked], &enrichment, Utc::now());
        let taste = profile.taste_embedding.unwrap();

        assert_eq!(taste.len(), 2);
        assert_relative_eq!(taste[0], 0.5);
        assert_relative_eq!(taste[1], 0.5);
    }

    #[test]
    fn test_mean_skips_mismatched_dimensions() {
        let a = [2.0f32, 4.0];
        let b = [1.0f32, 1.0, 1.0];
        let c = [0.0f32, 0.0];

        let mean = mean_embedding(&[&a[..], &b[..], &c[..]]).unwrap();
        assert_eq!(mean, vec![1.0, 2.0]);
        assert_eq!(mean_embedding(&[]), None);
    }

    #[test]
    fn test_zero_vector_taste_is_present() {
        let saved = interaction(InteractionType::Saved, 1.0, "Fantasy", 1);
        let enrichment = HashMap::from([(
            saved.book_isbn.clone(),
            entry(&saved.book_isbn, &[], Some(vec![0.0, 0.0])),
        )]);

        let profile = analyze_preferences(&[saved], &enrichment, Utc::now());
        assert_eq!(profile.taste_embedding, Some(vec![0.0, 0.0]));
    }
}
