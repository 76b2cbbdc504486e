use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;

use chrono::Utc;

use crate::db::{PreferenceStore, RecommendationStore};
use crate::models::RecommendationRecord;
use crate::services::invoker::{content_digest, InvocationError, ModelInvoker};
use crate::services::parser::{parse_response, ParseError};
use crate::services::validator::{validate, ValidationError};
use crate::services::{prompt, ranker};

/// Everything a recommend call can fail with
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RecommendError {
    #[error("PRECONDITION: {0}")]
    Precondition(String),

    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Progress of a single recommend call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    BuildingPrompt,
    Invoking,
    Parsing,
    Validating,
    Ranking,
    Committed,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::BuildingPrompt => "building_prompt",
            Stage::Invoking => "invoking",
            Stage::Parsing => "parsing",
            Stage::Validating => "validating",
            Stage::Ranking => "ranking",
            Stage::Committed => "committed",
        };
        write!(f, "{}", name)
    }
}

/// Generates and stores model-backed recommendations
///
/// Flow: preferences + candidate pool → prompt → model → parse → validate →
/// rank → replace the user's stored set. The store is written only when every
/// step succeeded; failures leave the previous set servable.
///
/// Concurrent calls for the same user are not serialized: whichever finishes
/// last wins.
pub struct Recommender {
    preferences: Arc<PreferenceStore>,
    recommendations: Arc<RecommendationStore>,
    invoker: ModelInvoker,
    model_id: String,
}

impl Recommender {
    pub fn new(
        preferences: Arc<PreferenceStore>,
        recommendations: Arc<RecommendationStore>,
        invoker: ModelInvoker,
        model_id: String,
    ) -> Self {
        Self {
            preferences,
            recommendations,
            invoker,
            model_id,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Recommends up to `k` unseen items from `candidates` for `user`
    pub async fn recommend(
        &self,
        user: &str,
        k: usize,
        candidates: &[String],
    ) -> Result<Vec<RecommendationRecord>, RecommendError> {
        let mut stage = Stage::Idle;
        let result = self.run(user, k, candidates, &mut stage).await;

        match &result {
            Ok(records) => tracing::info!(
                user = %user,
                count = records.len(),
                "Recommendations committed"
            ),
            Err(e) => tracing::warn!(
                user = %user,
                stage = %stage,
                error = %e,
                "Recommendation failed, stored results left untouched"
            ),
        }

        result
    }

    async fn run(
        &self,
        user: &str,
        k: usize,
        candidates: &[String],
        stage: &mut Stage,
    ) -> Result<Vec<RecommendationRecord>, RecommendError> {
        if k == 0 {
            return Err(RecommendError::Precondition(
                "k must be at least 1".to_string(),
            ));
        }

        let preferences = self.preferences.list(user).await;
        if preferences.is_empty() {
            tracing::debug!(user = %user, "No preference signals, committing empty result");
            return Ok(self.commit(user, Vec::new(), stage).await);
        }

        let rated: HashSet<&str> = preferences.iter().map(|p| p.item.as_str()).collect();
        let mut unseen = HashSet::new();
        let unseen_ordered: Vec<String> = candidates
            .iter()
            .filter(|c| !rated.contains(c.as_str()))
            .filter(|c| unseen.insert(c.to_string()))
            .cloned()
            .collect();

        if unseen_ordered.is_empty() {
            tracing::debug!(user = %user, "No unseen candidates, committing empty result");
            return Ok(self.commit(user, Vec::new(), stage).await);
        }

        enter(stage, Stage::BuildingPrompt, user);
        let prompt = prompt::build_prompt(&preferences, &unseen_ordered, k);
        let digest = content_digest(&self.model_id, &prompt);

        enter(stage, Stage::Invoking, user);
        let raw = self.invoker.invoke(&prompt, &self.model_id).await?;

        enter(stage, Stage::Parsing, user);
        let payload = parse_response(&raw)?;

        enter(stage, Stage::Validating, user);
        let entries = validate(&payload, &unseen)?;

        enter(stage, Stage::Ranking, user);
        let ranked = ranker::rank(entries, &unseen, k);

        let generated_at = Utc::now();
        let records = ranked
            .into_iter()
            .map(|entry| RecommendationRecord {
                user: user.to_string(),
                item: entry.id,
                score: entry.score,
                rationale: entry.rationale,
                generated_at,
                model_version: self.model_id.clone(),
                prompt_digest: digest.clone(),
            })
            .collect();

        Ok(self.commit(user, records, stage).await)
    }

    async fn commit(
        &self,
        user: &str,
        records: Vec<RecommendationRecord>,
        stage: &mut Stage,
    ) -> Vec<RecommendationRecord> {
        self.recommendations.replace(user, records.clone()).await;
        enter(stage, Stage::Committed, user);
        records
    }
}

fn enter(stage: &mut Stage, next: Stage, user: &str) {
    tracing::debug!(user = %user, from = %stage, to = %next, "Recommend stage transition");
    *stage = next;
}
