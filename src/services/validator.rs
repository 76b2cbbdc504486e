use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::models::ScoredCandidate;

/// Largest allowed gap between the stated percentage and the score
pub const PERCENT_TOLERANCE: i64 = 10;

/// Most sentence-like segments a rationale may contain
pub const MAX_RATIONALE_SEGMENTS: usize = 3;

static PERCENT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\((\d{1,3})% match\) ").expect("valid regex"));

static BANNED_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(strong|moderate|low)\b").expect("valid regex"));

/// Reasons a parsed model answer is rejected
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("VALIDATION_FAILURE(shape): entry {index}: {reason}")]
    Shape { index: usize, reason: String },

    #[error("VALIDATION_FAILURE(eligibility): `{id}` is not an unseen candidate")]
    Eligibility { id: String },

    #[error("VALIDATION_FAILURE(duplicate): `{id}` appears more than once")]
    Duplicate { id: String },

    #[error("VALIDATION_FAILURE(score-range): `{id}` has score {score} outside [0, 1]")]
    ScoreRange { id: String, score: f64 },

    #[error("VALIDATION_FAILURE(percent-mismatch): `{id}`: {reason}")]
    PercentMismatch { id: String, reason: String },

    #[error("VALIDATION_FAILURE(banned-vocabulary): `{id}` rationale uses `{word}`")]
    BannedVocabulary { id: String, word: String },

    #[error("VALIDATION_FAILURE(length-exceeded): `{id}` rationale has {segments} sentences")]
    LengthExceeded { id: String, segments: usize },
}

impl ValidationError {
    pub fn subkind(&self) -> &'static str {
        match self {
            ValidationError::Shape { .. } => "shape",
            ValidationError::Eligibility { .. } => "eligibility",
            ValidationError::Duplicate { .. } => "duplicate",
            ValidationError::ScoreRange { .. } => "score-range",
            ValidationError::PercentMismatch { .. } => "percent-mismatch",
            ValidationError::BannedVocabulary { .. } => "banned-vocabulary",
            ValidationError::LengthExceeded { .. } => "length-exceeded",
        }
    }
}

/// Checks a parsed answer against the output contract
///
/// Runs shape, eligibility/uniqueness, score/percentage and content checks in
/// that order over all entries; the first violation rejects the whole answer.
pub fn validate(
    payload: &Value,
    unseen: &HashSet<String>,
) -> Result<Vec<ScoredCandidate>, ValidationError> {
    let entries = check_shape(payload)?;
    check_eligibility(&entries, unseen)?;
    for entry in &entries {
        check_score(entry)?;
    }
    for (index, entry) in entries.iter().enumerate() {
        check_content(index, entry)?;
    }
    Ok(entries)
}

fn check_shape(payload: &Value) -> Result<Vec<ScoredCandidate>, ValidationError> {
    let shape = |index: usize, reason: &str| ValidationError::Shape {
        index,
        reason: reason.to_string(),
    };

    let raw = payload
        .get("recommendations")
        .and_then(Value::as_array)
        .ok_or_else(|| shape(0, "`recommendations` is not an array"))?;

    // An empty answer from a non-empty profile is treated as a reasoning failure
    if raw.is_empty() {
        return Err(shape(0, "`recommendations` is empty"));
    }

    raw.iter()
        .enumerate()
        .map(|(index, entry)| {
            let id = entry
                .get("id")
                .and_then(Value::as_str)
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| shape(index, "missing or empty `id`"))?;
            let score = entry
                .get("score")
                .and_then(Value::as_f64)
                .ok_or_else(|| shape(index, "missing or non-numeric `score`"))?;
            let rationale = entry
                .get("rationale")
                .and_then(Value::as_str)
                .filter(|r| !r.trim().is_empty())
                .ok_or_else(|| shape(index, "missing or empty `rationale`"))?;

            Ok(ScoredCandidate {
                id: id.to_string(),
                score,
                rationale: rationale.to_string(),
            })
        })
        .collect()
}

fn check_eligibility(
    entries: &[ScoredCandidate],
    unseen: &HashSet<String>,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !unseen.contains(&entry.id) {
            return Err(ValidationError::Eligibility {
                id: entry.id.clone(),
            });
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(ValidationError::Duplicate {
                id: entry.id.clone(),
            });
        }
    }
    Ok(())
}

fn check_score(entry: &ScoredCandidate) -> Result<(), ValidationError> {
    if !(0.0..=1.0).contains(&entry.score) {
        return Err(ValidationError::ScoreRange {
            id: entry.id.clone(),
            score: entry.score,
        });
    }

    let mismatch = |reason: String| ValidationError::PercentMismatch {
        id: entry.id.clone(),
        reason,
    };

    let stated: i64 = PERCENT_PREFIX
        .captures(&entry.rationale)
        .and_then(|caps| caps[1].parse().ok())
        .ok_or_else(|| mismatch("rationale lacks a `(NN% match) ` prefix".to_string()))?;

    if stated > 100 {
        return Err(mismatch(format!("stated {}% exceeds 100%", stated)));
    }

    let expected = (entry.score * 100.0).round() as i64;
    if (stated - expected).abs() > PERCENT_TOLERANCE {
        return Err(mismatch(format!(
            "stated {}% but score implies {}%",
            stated, expected
        )));
    }

    Ok(())
}

fn check_content(index: usize, entry: &ScoredCandidate) -> Result<(), ValidationError> {
    let body = PERCENT_PREFIX.replace(&entry.rationale, "");
    let body = body.trim();

    if body.is_empty() {
        return Err(ValidationError::Shape {
            index,
            reason: format!("`{}` rationale is only a percentage prefix", entry.id),
        });
    }

    if let Some(found) = BANNED_WORDS.find(body) {
        return Err(ValidationError::BannedVocabulary {
            id: entry.id.clone(),
            word: found.as_str().to_lowercase(),
        });
    }

    let segments = body
        .split(['.', '?', '!'])
        .filter(|s| !s.trim().is_empty())
        .count();
    if segments > MAX_RATIONALE_SEGMENTS {
        return Err(ValidationError::LengthExceeded {
            id: entry.id.clone(),
            segments,
        });
    }

    Ok(())
}
