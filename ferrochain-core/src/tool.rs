use crate::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A named, described callable an agent can invoke by name.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the accepted arguments.
    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": { "tool_input": { "type": "string" } },
            "required": ["tool_input"],
        })
    }

    /// Whether the tool takes one plain string. Tools taking several named
    /// fields return `false` and can only be used by structured agents.
    fn single_input(&self) -> bool {
        true
    }

    /// When set, the observation is returned to the caller as the final answer.
    fn return_direct(&self) -> bool {
        false
    }

    async fn invoke(&self, input: Value) -> Result<String, ToolError>;
}
