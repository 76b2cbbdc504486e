use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod user_preferences;

pub use user_preferences::{Affinity, PreferenceSignal};

/// A validated, ranked recommendation as stored for a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationRecord {
    pub user: String,
    pub item: String,
    /// Always within [0, 1]
    pub score: f64,
    /// Begins with a `(NN% match) ` marker consistent with `score`
    pub rationale: String,
    pub generated_at: DateTime<Utc>,
    pub model_version: String,
    pub prompt_digest: String,
}

/// One entry of a model answer after it passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub id: String,
    pub score: f64,
    pub rationale: String,
}

/// Read view returned by top-k lookups
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationSummary {
    pub item: String,
    pub rationale: String,
}

impl From<&RecommendationRecord> for RecommendationSummary {
    fn from(record: &RecommendationRecord) -> Self {
        Self {
            item: record.item.clone(),
            rationale: record.rationale.clone(),
        }
    }
}

/// Request body for a recommend call
#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub k: usize,
    pub candidates: Vec<String>,
}

/// Request body for a preference upsert
#[derive(Debug, Deserialize)]
pub struct UpsertPreferenceRequest {
    pub affinity: Affinity,
}
