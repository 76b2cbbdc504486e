use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::models::{RecommendationRecord, RecommendationSummary};

/// Last validated recommendation set per user
///
/// Writes replace a user's whole set; nothing is ever merged or appended.
#[derive(Default)]
pub struct RecommendationStore {
    records: RwLock<HashMap<String, Vec<RecommendationRecord>>>,
}

impl RecommendationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically substitutes the user's entire set
    pub async fn replace(&self, user: &str, records: Vec<RecommendationRecord>) {
        self.records.write().await.insert(user.to_string(), records);
    }

    pub async fn list(&self, user: &str) -> Vec<RecommendationRecord> {
        self.records
            .read()
            .await
            .get(user)
            .cloned()
            .unwrap_or_default()
    }

    /// Best `k` stored items, by score descending then most recent generation
    pub async fn top_k(&self, user: &str, k: usize) -> Vec<RecommendationSummary> {
        let mut records = self.list(user).await;
        records.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.generated_at.cmp(&a.generated_at))
        });

        records
            .iter()
            .take(k)
            .map(RecommendationSummary::from)
            .collect()
    }
}
