use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Declared strength of a user's preference for an item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Affinity {
    #[serde(alias = "STRONG")]
    Strong,
    #[serde(alias = "MODERATE")]
    Moderate,
    #[serde(alias = "LOW")]
    Low,
}

impl Affinity {
    /// Weight of this tier in the scoring rubric
    pub fn weight(self) -> f64 {
        match self {
            Affinity::Strong => 1.0,
            Affinity::Moderate => 0.6,
            Affinity::Low => 0.2,
        }
    }

    /// Literal tier word as it appears in prompts
    pub fn as_str(self) -> &'static str {
        match self {
            Affinity::Strong => "STRONG",
            Affinity::Moderate => "MODERATE",
            Affinity::Low => "LOW",
        }
    }

    pub const ALL: [Affinity; 3] = [Affinity::Strong, Affinity::Moderate, Affinity::Low];
}

impl Display for Affinity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One user's declared affinity for one item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreferenceSignal {
    pub user: String,
    pub item: String,
    pub affinity: Affinity,
    pub updated_at: DateTime<Utc>,
}

impl PreferenceSignal {
    pub fn new(user: impl Into<String>, item: impl Into<String>, affinity: Affinity) -> Self {
        Self {
            user: user.into(),
            item: item.into(),
            affinity,
            updated_at: Utc::now(),
        }
    }
}
