//! Frame analysis
//!
//! An [`AnalysisHook`] is an external capability: given an encoded frame it
//! returns zero or more [`Annotation`]s. The capture loop calls it on a
//! sample of frames from a separate task and never waits for the result.
//! What an annotation means is up to the hook; this crate only applies the
//! [`RewardPolicy`] to confidence and category.

pub mod http;
pub mod reward;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::frame::EncodedFrame;

pub use http::HttpAnalysisHook;
pub use reward::{Evaluation, Highlight, RewardPolicy};

/// One detection or classification returned by an analysis hook
///
/// Deserializes from either `category` or `type`; `category` wins when a
/// reply carries both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAnnotation")]
pub struct Annotation {
    /// What was detected (`"dog"`, `"cat"`, ...)
    pub category: String,

    /// Confidence in `[0, 1]`
    pub confidence: f64,

    /// Activity tag (`"playing"`, `"trick"`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,

    /// Emotion tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
}

#[derive(Deserialize)]
struct RawAnnotation {
    category: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    confidence: f64,
    #[serde(default)]
    activity: Option<String>,
    #[serde(default)]
    emotion: Option<String>,
}

impl TryFrom<RawAnnotation> for Annotation {
    type Error = String;

    fn try_from(raw: RawAnnotation) -> Result<Self, Self::Error> {
        let category = raw
            .category
            .or(raw.kind)
            .ok_or_else(|| "missing field `category`".to_string())?;
        Ok(Self {
            category,
            confidence: raw.confidence,
            activity: raw.activity,
            emotion: raw.emotion,
        })
    }
}

impl Annotation {
    /// Create an annotation without tags
    pub fn new(category: impl Into<String>, confidence: f64) -> Self {
        Self {
            category: category.into(),
            confidence,
            activity: None,
            emotion: None,
        }
    }

    /// Set the activity tag
    pub fn with_activity(mut self, activity: impl Into<String>) -> Self {
        self.activity = Some(activity.into());
        self
    }

    /// Set the emotion tag
    pub fn with_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.emotion = Some(emotion.into());
        self
    }
}

/// Analysis failure
///
/// Never escapes the capture loop; failures are logged and discarded.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Hook did not answer in time
    #[error("Analysis timed out")]
    Timeout,

    /// Transport error talking to the analysis service
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Analysis service returned a non-success status
    #[error("Analysis service returned status {0}")]
    Status(u16),

    /// Response could not be interpreted
    #[error("Invalid analysis response: {0}")]
    Parse(String),
}

/// Asynchronous frame analysis capability
#[async_trait]
pub trait AnalysisHook: Send + Sync {
    /// Analyze one encoded frame
    async fn analyze(&self, frame: &EncodedFrame) -> Result<Vec<Annotation>, AnalysisError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_type_alias_and_extras() {
        let json = r#"{
            "type": "dog",
            "confidence": 0.95,
            "bbox": [0.2, 0.3, 0.4, 0.5],
            "activity": "playing",
            "emotion": "happy"
        }"#;
        let annotation: Annotation = serde_json::from_str(json).unwrap();

        assert_eq!(
            annotation,
            Annotation::new("dog", 0.95)
                .with_activity("playing")
                .with_emotion("happy")
        );
    }

    #[test]
    fn test_deserialize_category_and_type_together() {
        let json = r#"[
            {"category": "dog", "type": "animal", "confidence": 0.9},
            {"type": "cat", "confidence": 0.8}
        ]"#;
        let annotations: Vec<Annotation> = serde_json::from_str(json).unwrap();

        assert_eq!(annotations[0].category, "dog");
        assert_eq!(annotations[1].category, "cat");
    }

    #[test]
    fn test_deserialize_requires_category() {
        let result = serde_json::from_str::<Annotation>(r#"{"confidence": 0.9}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_skips_missing_tags() {
        let json = serde_json::to_string(&Annotation::new("cat", 0.5)).unwrap();
        assert_eq!(json, r#"{"category":"cat","confidence":0.5}"#);
    }
}
