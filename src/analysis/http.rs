//! Analysis through an OpenAI-compatible vision endpoint
//!
//! Sends the frame as a base64 data URL in a chat completion request and
//! reads a JSON array of annotations out of the reply text.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{AnalysisError, AnalysisHook, Annotation};
use crate::frame::EncodedFrame;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const DEFAULT_PROMPT: &str = "Analyze this camera frame. Report every animal or person you see, \
what they are doing and how confident you are. Respond with only a JSON array of objects with \
the fields \"category\", \"confidence\" (0 to 1), \"activity\" and \"emotion\".";

/// HTTP analysis hook
pub struct HttpAnalysisHook {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

impl HttpAnalysisHook {
    /// Create a hook for `endpoint` (a `/chat/completions` URL) and `model`
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: None,
            model: model.into(),
            prompt: DEFAULT_PROMPT.to_string(),
        })
    }

    /// Build from `ANALYSIS_API_URL`, `ANALYSIS_MODEL` and `ANALYSIS_API_KEY`
    ///
    /// Returns `None` when no endpoint is configured.
    pub fn from_env() -> Option<Result<Self, AnalysisError>> {
        let endpoint = std::env::var("ANALYSIS_API_URL").ok()?;
        let model = std::env::var("ANALYSIS_MODEL")
            .unwrap_or_else(|_| "llama-3.2-90b-vision-preview".to_string());
        let api_key = std::env::var("ANALYSIS_API_KEY").ok();

        Some(Self::new(endpoint, model).map(|hook| match api_key {
            Some(key) => hook.with_api_key(key),
            None => hook,
        }))
    }

    /// Set the bearer token
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Replace the instruction sent with each frame
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    fn request_body(&self, frame: &EncodedFrame) -> Value {
        let image_url = format!("data:image/jpeg;base64,{}", STANDARD.encode(&frame.data));
        json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": self.prompt },
                    { "type": "image_url", "image_url": { "url": image_url } }
                ]
            }],
            "max_tokens": 1000,
            "temperature": 0.3
        })
    }
}

#[async_trait]
impl AnalysisHook for HttpAnalysisHook {
    async fn analyze(&self, frame: &EncodedFrame) -> Result<Vec<Annotation>, AnalysisError> {
        let mut request = self.client.post(&self.endpoint).json(&self.request_body(frame));
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::Status(status.as_u16()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AnalysisError::Parse("response has no choices".into()))?;

        parse_annotations(&content)
    }
}

/// Extract annotations from model output
///
/// Accepts a bare JSON array, an object wrapping one under `annotations` or
/// `detections`, or either of those embedded in surrounding prose or a code
/// fence.
pub fn parse_annotations(text: &str) -> Result<Vec<Annotation>, AnalysisError> {
    let text = text.trim();

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return annotations_from_value(value);
    }

    // Fall back to the outermost bracketed span
    let start = text.find('[');
    let end = text.rfind(']');
    match (start, end) {
        (Some(start), Some(end)) if start < end => {
            let value = serde_json::from_str::<Value>(&text[start..=end])
                .map_err(|e| AnalysisError::Parse(e.to_string()))?;
            annotations_from_value(value)
        }
        _ => Err(AnalysisError::Parse("no JSON array in response".into())),
    }
}

fn annotations_from_value(value: Value) -> Result<Vec<Annotation>, AnalysisError> {
    let list = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => map
            .remove("annotations")
            .or_else(|| map.remove("detections"))
            .ok_or_else(|| AnalysisError::Parse("object has no annotation list".into()))?,
        other => {
            return Err(AnalysisError::Parse(format!(
                "expected array, found {}",
                other
            )))
        }
    };

    serde_json::from_value(list).map_err(|e| AnalysisError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_parse_bare_array() {
        let text = r#"[{"category":"dog","confidence":0.95,"activity":"playing"}]"#;
        let annotations = parse_annotations(text).unwrap();

        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].category, "dog");
        assert_eq!(annotations[0].activity.as_deref(), Some("playing"));
    }

    #[test]
    fn test_parse_wrapped_object() {
        let text = r#"{"detections":[{"type":"cat","confidence":0.81}]}"#;
        let annotations = parse_annotations(text).unwrap();

        assert_eq!(annotations, vec![Annotation::new("cat", 0.81)]);
    }

    #[test]
    fn test_parse_code_fence() {
        let text = "Here is what I found:\n```json\n[{\"category\":\"dog\",\"confidence\":0.9}]\n```";
        let annotations = parse_annotations(text).unwrap();

        assert_eq!(annotations, vec![Annotation::new("dog", 0.9)]);
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_annotations("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_prose_fails() {
        let result = parse_annotations("I see a happy dog.");
        assert!(matches!(result, Err(AnalysisError::Parse(_))));
    }

    #[test]
    fn test_request_body_embeds_frame() {
        let hook = HttpAnalysisHook::new("http://localhost:9/v1/chat/completions", "vision")
            .unwrap()
            .with_prompt("find pets");
        let frame = EncodedFrame {
            sequence: 0,
            captured_at: Utc::now(),
            width: 1,
            height: 1,
            data: Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xD9]),
        };

        let body = hook.request_body(&frame);

        assert_eq!(body["model"], "vision");
        assert_eq!(body["messages"][0]["content"][0]["text"], "find pets");
        assert_eq!(
            body["messages"][0]["content"][1]["image_url"]["url"],
            "data:image/jpeg;base64,/9j/2Q=="
        );
    }
}
