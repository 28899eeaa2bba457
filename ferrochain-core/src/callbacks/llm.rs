//! Structured payloads for model-call callbacks.

/// Model call parameters captured at start time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LlmInput {
    pub model: String,
    /// Rendered prompt, after template expansion
    pub prompt: String,
    pub stop_sequences: Vec<String>,
}

/// Model call result captured at end time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LlmResult {
    pub model: String,
    pub generations: Vec<String>,
}
