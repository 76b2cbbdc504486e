use std::collections::HashSet;

use crate::models::ScoredCandidate;

/// Score assigned when a value cannot be interpreted
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Clamps, filters to unseen items, and keeps the best `k` by score
///
/// Sorting is stable, so entries with equal scores keep the model's order.
pub fn rank(
    entries: Vec<ScoredCandidate>,
    unseen: &HashSet<String>,
    k: usize,
) -> Vec<ScoredCandidate> {
    let mut ranked: Vec<ScoredCandidate> = entries
        .into_iter()
        .filter(|entry| unseen.contains(&entry.id))
        .map(|mut entry| {
            entry.score = clamp_score(entry.score);
            entry
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(k);
    ranked
}

fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        NEUTRAL_SCORE
    }
}
