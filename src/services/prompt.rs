use serde_json::json;

use crate::models::{Affinity, PreferenceSignal};

/// Penalty applied per unit of similarity above the low-affinity threshold
pub const LOW_AFFINITY_PENALTY: f64 = 0.3;

/// Similarity to a low-affinity item above which the penalty kicks in
pub const LOW_AFFINITY_THRESHOLD: f64 = 0.6;

/// Renders the full ranking prompt for one recommend call
///
/// Output depends only on the arguments, so identical inputs always produce
/// the same text and therefore the same cache digest.
pub fn build_prompt(preferences: &[PreferenceSignal], candidates: &[String], k: usize) -> String {
    let profile: Vec<_> = preferences
        .iter()
        .map(|p| json!({ "affinity": p.affinity.as_str(), "item": p.item }))
        .collect();

    let weights = Affinity::ALL
        .iter()
        .map(|a| format!("{}={:.1}", a.as_str(), a.weight()))
        .collect::<Vec<_>>()
        .join(", ");

    let banned = Affinity::ALL
        .iter()
        .map(|a| format!("\"{}\"", a.as_str().to_lowercase()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You rank items for a user based on the items they already rated.\n\
         \n\
         USER PREFERENCES (JSON):\n\
         {profile}\n\
         \n\
         CANDIDATES (JSON):\n\
         {candidates}\n\
         \n\
         SCORING RUBRIC (follow exactly):\n\
         1. Map each preference affinity to a weight: {weights}.\n\
         2. For each candidate, estimate a similarity in [0,1] to every preferred item.\n\
         3. Compute the weighted average similarity using those weights.\n\
         4. Subtract {penalty} * max(0, S_low - {threshold}), where S_low is the candidate's \
         highest similarity to any LOW item (0 if there are none).\n\
         5. Clamp the result to [0,1]. That is the score.\n\
         \n\
         OUTPUT FORMAT (strict):\n\
         Return only a JSON object of the form \
         {{\"recommendations\": [{{\"id\": \"<candidate>\", \"score\": <number>, \"rationale\": \"<text>\"}}]}}.\n\
         - Return at most {k} entries, ordered by score descending.\n\
         - Every id must be copied exactly from CANDIDATES; never repeat an id.\n\
         - The rationale is at most 2 sentences.\n\
         - The rationale must begin with the literal prefix \"(NN% match) \" where NN = round(score*100).\n\
         - Never use the words {banned} in the rationale.\n\
         - Never mention location.\n\
         - Cite one preferred item by name and one concrete attribute of it when known.\n\
         - Do not fabricate facts; if unsure about an attribute, leave it out.\n",
        profile = serde_json::Value::Array(profile),
        candidates = json!(candidates),
        weights = weights,
        penalty = LOW_AFFINITY_PENALTY,
        threshold = LOW_AFFINITY_THRESHOLD,
        k = k,
        banned = banned,
    )
}
