//! Turning classifier scores into risk tiers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const HIGH_THRESHOLD: f64 = 0.8;
const MEDIUM_THRESHOLD: f64 = 0.4;
const SIGNAL_THRESHOLD: f64 = 0.5;

const NO_SIGNALS: &str = "No strong signals detected.";
pub const AI_FAILURE: &str = "AI failure";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    High,
    Medium,
    Low,
    Unknown,
}

impl RiskTier {
    pub const ALL: [RiskTier; 4] = [Self::High, Self::Medium, Self::Low, Self::Unknown];

    pub fn from_score(score: f64) -> Self {
        if score > HIGH_THRESHOLD {
            Self::High
        } else if score > MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Unknown => "Unknown",
        };
        f.pad(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLabel {
    pub label: String,
    pub score: f64,
}

/// Read a classifier body as a list of scored labels.
///
/// Accepts a flat array, or the single-input batch form (`[[...]]`) the
/// inference API answers with. Anything else is `None`.
pub fn parse_scores(body: &Value) -> Option<Vec<ScoredLabel>> {
    let items = match body.as_array()?.as_slice() {
        [Value::Array(inner)] => inner,
        _ => body.as_array()?,
    };
    items
        .iter()
        .map(|item| serde_json::from_value(item.clone()).ok())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub tier: RiskTier,
    pub reason: String,
}

impl Assessment {
    pub fn failure() -> Self {
        Assessment {
            tier: RiskTier::Unknown,
            reason: AI_FAILURE.to_owned(),
        }
    }
}

/// Tier from the highest score; reason lists the labels above 0.5.
///
/// An empty list scores as negative infinity, i.e. `Low`.
pub fn assess(scores: &[ScoredLabel]) -> Assessment {
    let top = scores
        .iter()
        .map(|s| s.score)
        .fold(f64::NEG_INFINITY, f64::max);
    let signals: Vec<&str> = scores
        .iter()
        .filter(|s| s.score > SIGNAL_THRESHOLD)
        .map(|s| s.label.as_str())
        .collect();
    let reason = if signals.is_empty() {
        NO_SIGNALS.to_owned()
    } else {
        format!("Detected: {}", signals.join(", "))
    };
    Assessment {
        tier: RiskTier::from_score(top),
        reason,
    }
}

/// One analyzed tweet, in the shape it is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedItem {
    pub user_id: String,
    #[serde(rename = "tweetId")]
    pub item_id: String,
    pub text: String,
    #[serde(rename = "risk")]
    pub risk_tier: RiskTier,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Counts per tier, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RiskSummary {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unknown: usize,
}

impl RiskSummary {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a AnalyzedItem>) -> Self {
        let mut summary = RiskSummary::default();
        for item in items {
            match item.risk_tier {
                RiskTier::High => summary.high += 1,
                RiskTier::Medium => summary.medium += 1,
                RiskTier::Low => summary.low += 1,
                RiskTier::Unknown => summary.unknown += 1,
            }
        }
        summary
    }

    pub fn count(&self, tier: RiskTier) -> usize {
        match tier {
            RiskTier::High => self.high,
            RiskTier::Medium => self.medium,
            RiskTier::Low => self.low,
            RiskTier::Unknown => self.unknown,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low + self.unknown
    }
}
