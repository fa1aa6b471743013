use std::cmp::Ordering;

/// Cosine similarity of two equal-length vectors.
///
/// Returns `None` when either vector has zero magnitude, so callers never see a
/// NaN. Callers must not pass vectors of different lengths; use
/// [`embedding_similarity`] when that is not already guaranteed.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    debug_assert_eq!(a.len(), b.len(), "cosine_similarity needs equal lengths");

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a * norm_b))
}

/// Similarity between two optional embeddings.
///
/// Missing embeddings, mismatched dimensions and zero vectors all mean
/// "no similarity signal" and yield `None`; none of them is an error.
pub fn embedding_similarity(a: Option<&[f32]>, b: Option<&[f32]>) -> Option<f32> {
    match (a, b) {
        (Some(a), Some(b)) if !a.is_empty() && a.len() == b.len() => cosine_similarity(a, b),
        _ => None,
    }
}

/// Order for descending scores where `None` ("no signal") ranks below any score.
pub fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable descending sort by score. Items with equal scores keep their input order.
pub fn rank_descending<T>(mut scored: Vec<(T, Option<f64>)>) -> Vec<T> {
    // slice::sort_by is stable, which the ranking contract depends on.
    scored.sort_by(|(_, a), (_, b)| descending(*a, *b));
    scored.into_iter().map(|(item, _)| item).collect()
}
