//! Turns raw model text into an [`AgentStep`] or a recoverable [`ParseError`].
//!
//! Two grammars are supported. The ReAct text grammar (`Action:` /
//! `Action Input:` lines) used by zero-shot agents, and the JSON blob grammar
//! (a fenced `{"action": .., "action_input": ..}` object) used by chat agents.
//! Both share the `Final Answer:` terminal marker.

mod json_blob;
mod react;

use serde::Serialize;
use thiserror::Error;

use crate::action::AgentStep;

pub use json_blob::{JsonBlobOutputParser, FINAL_ANSWER_TOOL};
pub use react::ReActOutputParser;

pub const FINAL_ANSWER_ACTION: &str = "Final Answer:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParseErrorKind {
    MissingAction,
    MissingActionInput,
    MalformedJson,
    ConflictingFinalAndAction,
    Generic,
}

/// Model output that matched neither an action nor a final answer.
///
/// Never fatal on its own: the executor feeds [`ParseError::observation`] back
/// to the model so it can correct itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not parse model output ({kind:?}): {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub raw_text: String,
    format_hint: &'static str,
}

impl ParseError {
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        raw_text: impl Into<String>,
        format_hint: &'static str,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            raw_text: raw_text.into(),
            format_hint,
        }
    }

    /// Text handed back to the model in place of a tool observation.
    pub fn observation(&self) -> String {
        format!(
            "Invalid or incomplete response: {}. {}",
            self.message, self.format_hint
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentOutputParser {
    ReAct(ReActOutputParser),
    JsonBlob(JsonBlobOutputParser),
}

impl AgentOutputParser {
    pub fn react() -> Self {
        Self::ReAct(ReActOutputParser)
    }

    pub fn json_blob() -> Self {
        Self::JsonBlob(JsonBlobOutputParser)
    }

    pub fn parse(&self, text: &str) -> Result<AgentStep, ParseError> {
        match self {
            AgentOutputParser::ReAct(parser) => parser.parse(text),
            AgentOutputParser::JsonBlob(parser) => parser.parse(text),
        }
    }
}

/// Everything after the last terminal marker, trimmed.
fn final_answer_text(text: &str) -> Option<&str> {
    text.rsplit_once(FINAL_ANSWER_ACTION)
        .map(|(_, answer)| answer.trim())
}
