use ferrochain_core::{FerroError, ToolError};
use thiserror::Error;

use crate::output_parser::ParseError;
use crate::policy::AgentType;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("tool '{name}' must have a non-empty description")]
    ToolMissingDescription { name: String },
    #[error("agent '{agent}' only supports single-input tools, but '{name}' takes structured input")]
    MultiInputToolUnsupported { agent: AgentType, name: String },
    #[error("tool name must not be empty or whitespace: {name:?}")]
    InvalidToolName { name: String },
    #[error("duplicate tool name: {name}")]
    DuplicateToolName { name: String },
    #[error("invalid prompt: {0}")]
    InvalidPrompt(String),
    #[error("invalid agent configuration: {0}")]
    InvalidConfig(String),
    #[error("no factory registered for agent type '{0}'")]
    UnknownAgentType(AgentType),
    #[error(transparent)]
    OutputParsing(#[from] ParseError),
    #[error("model call failed: {0}")]
    Model(#[source] FerroError),
    #[error("tool '{name}' failed: {source}")]
    Tool {
        name: String,
        #[source]
        source: ToolError,
    },
    #[error("agent run already finished")]
    RunFinished,
}

impl AgentError {
    /// Parse failures are fed back to the model; everything else ends the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AgentError::OutputParsing(_))
    }

    /// Errors raised while assembling a policy, before any run starts.
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            AgentError::ToolMissingDescription { .. }
                | AgentError::MultiInputToolUnsupported { .. }
                | AgentError::InvalidToolName { .. }
                | AgentError::DuplicateToolName { .. }
                | AgentError::InvalidPrompt(_)
                | AgentError::InvalidConfig(_)
                | AgentError::UnknownAgentType(_)
        )
    }
}

impl From<AgentError> for FerroError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Model(inner) => inner,
            AgentError::Tool { name, source } => FerroError::ToolCallFailed {
                tool_name: name,
                reason: source.to_string(),
            },
            AgentError::OutputParsing(err) => FerroError::ParseFailed {
                output: err.raw_text,
                reason: err.message,
            },
            other => FerroError::Other(Box::new(other)),
        }
    }
}
