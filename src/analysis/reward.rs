//! Reward scoring and highlight selection
//!
//! For each annotation above `reward_threshold`, the stream's reward score
//! grows by `floor(base(category) * confidence)`. If the annotation is also
//! notable (its category or activity tag is in the notable set) and above
//! `highlight_threshold`, a [`Highlight`] is recorded.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Annotation;

/// A retained record of a notable, high-confidence annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    /// Notable tag that triggered the highlight
    #[serde(rename = "type")]
    pub kind: String,
    /// When the analysis result was applied
    pub timestamp: DateTime<Utc>,
    /// Confidence of the triggering annotation
    pub confidence: f64,
}

/// Outcome of evaluating one analysis result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    /// Reward to add to the stream score
    pub reward: u64,
    /// Highlights to append
    pub highlights: Vec<Highlight>,
}

/// Reward and highlight rules
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RewardPolicy {
    /// Annotations at or below this confidence earn nothing
    pub reward_threshold: f64,

    /// Notable annotations must exceed this confidence to become highlights
    pub highlight_threshold: f64,

    /// Tags that qualify for highlights
    pub notable: BTreeSet<String>,

    /// Base reward per category
    pub base_rewards: HashMap<String, u64>,

    /// Base reward for categories missing from `base_rewards`
    pub default_reward: u64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        let base_rewards = [
            ("dog", 10),
            ("cat", 8),
            ("activity", 5),
            ("trick", 15),
            ("emotion", 12),
        ]
        .into_iter()
        .map(|(category, reward)| (category.to_string(), reward))
        .collect();

        Self {
            reward_threshold: 0.8,
            highlight_threshold: 0.9,
            notable: ["playing", "trick"].into_iter().map(String::from).collect(),
            base_rewards,
            default_reward: 5,
        }
    }
}

impl RewardPolicy {
    /// Set the reward threshold
    pub fn reward_threshold(mut self, threshold: f64) -> Self {
        self.reward_threshold = threshold;
        self
    }

    /// Set the highlight threshold
    pub fn highlight_threshold(mut self, threshold: f64) -> Self {
        self.highlight_threshold = threshold;
        self
    }

    /// Add a notable tag
    pub fn notable(mut self, tag: impl Into<String>) -> Self {
        self.notable.insert(tag.into());
        self
    }

    /// Set the base reward for a category
    pub fn base_reward(mut self, category: impl Into<String>, reward: u64) -> Self {
        self.base_rewards.insert(category.into(), reward);
        self
    }

    /// Base reward for a category
    pub fn base_for(&self, category: &str) -> u64 {
        self.base_rewards
            .get(category)
            .copied()
            .unwrap_or(self.default_reward)
    }

    /// Reward earned by one annotation
    pub fn reward_for(&self, annotation: &Annotation) -> u64 {
        let confidence = sanitize(annotation.confidence);
        if confidence <= self.reward_threshold {
            return 0;
        }
        (self.base_for(&annotation.category) as f64 * confidence).floor() as u64
    }

    /// Highlight produced by one annotation, if any
    pub fn highlight_for(&self, annotation: &Annotation, at: DateTime<Utc>) -> Option<Highlight> {
        let confidence = sanitize(annotation.confidence);
        if confidence <= self.reward_threshold || confidence <= self.highlight_threshold {
            return None;
        }

        let tag = std::iter::once(annotation.category.as_str())
            .chain(annotation.activity.as_deref())
            .find(|tag| self.notable.contains(*tag))?;

        Some(Highlight {
            kind: tag.to_string(),
            timestamp: at,
            confidence,
        })
    }

    /// Evaluate a full analysis result
    pub fn evaluate(&self, annotations: &[Annotation], at: DateTime<Utc>) -> Evaluation {
        annotations
            .iter()
            .fold(Evaluation::default(), |mut eval, annotation| {
                eval.reward += self.reward_for(annotation);
                eval.highlights.extend(self.highlight_for(annotation, at));
                eval
            })
    }
}

/// Clamp to `[0, 1]`; NaN counts as zero confidence
fn sanitize(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}
