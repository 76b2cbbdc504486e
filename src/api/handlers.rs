use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::middleware::request_id::RequestId;
use crate::models::{
    PreferenceSignal, RecommendRequest, RecommendationRecord, RecommendationSummary,
    UpsertPreferenceRequest,
};

use super::AppState;

const DEFAULT_TOP_K: usize = 10;

#[derive(Debug, Deserialize)]
pub struct TopKQuery {
    pub k: Option<usize>,
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Lists a user's preference signals in insertion order
pub async fn list_preferences(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Json<Vec<PreferenceSignal>> {
    Json(state.preferences.list(&user).await)
}

/// Adds or updates one preference signal
pub async fn upsert_preference(
    State(state): State<AppState>,
    Path((user, item)): Path<(String, String)>,
    Json(request): Json<UpsertPreferenceRequest>,
) -> Json<PreferenceSignal> {
    let signal = state
        .preferences
        .upsert(&user, &item, request.affinity)
        .await;
    tracing::debug!(user = %user, item = %item, affinity = %request.affinity, "Preference upserted");
    Json(signal)
}

/// Removes one preference signal
pub async fn clear_preference(
    State(state): State<AppState>,
    Path((user, item)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    if state.preferences.clear(&user, &item).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "No preference for item {} of user {}",
            item, user
        )))
    }
}

/// Runs the model-backed pipeline and replaces the user's stored results
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(user): Path<String>,
    Json(request): Json<RecommendRequest>,
) -> AppResult<Json<Vec<RecommendationRecord>>> {
    tracing::info!(
        request_id = %request_id,
        user = %user,
        k = request.k,
        candidate_count = request.candidates.len(),
        "Processing recommendation request"
    );

    let records = state
        .recommender
        .recommend(&user, request.k, &request.candidates)
        .await?;

    Ok(Json(records))
}

/// Serves the stored results without calling the model
pub async fn top_recommendations(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(query): Query<TopKQuery>,
) -> AppResult<Json<Vec<RecommendationSummary>>> {
    let k = query.k.unwrap_or(DEFAULT_TOP_K);
    if k == 0 {
        return Err(AppError::InvalidInput("k must be at least 1".to_string()));
    }

    Ok(Json(state.recommendations.top_k(&user, k).await))
}
