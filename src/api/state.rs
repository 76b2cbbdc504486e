use std::sync::Arc;
use std::time::Duration;

use crate::db::{PreferenceStore, RecommendationStore, ResponseCache};
use crate::services::{ModelBackend, ModelInvoker, Recommender};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub preferences: Arc<PreferenceStore>,
    pub recommendations: Arc<RecommendationStore>,
    pub recommender: Arc<Recommender>,
}

impl AppState {
    /// Wires empty stores and a recommender around the given backend and cache
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        cache: Arc<dyn ResponseCache>,
        model_id: String,
        timeout: Duration,
        cache_ttl: Duration,
    ) -> Self {
        let preferences = Arc::new(PreferenceStore::new());
        let recommendations = Arc::new(RecommendationStore::new());
        let invoker = ModelInvoker::new(backend, cache, timeout, cache_ttl);
        let recommender = Recommender::new(
            preferences.clone(),
            recommendations.clone(),
            invoker,
            model_id,
        );

        Self {
            preferences,
            recommendations,
            recommender: Arc::new(recommender),
        }
    }
}
