use serde::{Deserialize, Serialize};

use crate::FerroError;

/// A single text-completion round trip.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CompletionRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            stop: Vec::new(),
        }
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        self
    }
}

/// Language model consumed by agents: prompt text in, generated text out.
///
/// Implementations own transport concerns (retries, rate limits). Any error
/// returned here ends the agent run that issued the call.
#[async_trait::async_trait]
pub trait CompletionLlm: Send + Sync + 'static {
    async fn complete(&self, request: CompletionRequest) -> Result<String, FerroError>;

    fn model_name(&self) -> &str {
        "unknown"
    }
}
