use std::sync::OnceLock;

use ferrochain_core::{value_to_text, Value};
use regex::Regex;

use super::{final_answer_text, ParseError, ParseErrorKind, FINAL_ANSWER_ACTION};
use crate::action::{AgentAction, AgentFinish, AgentStep};

/// `action` value structured agents use to answer instead of calling a tool.
pub const FINAL_ANSWER_TOOL: &str = "Final Answer";

const FORMAT_HINT: &str = "Respond with a single $JSON_BLOB inside a ``` fenced block containing an \"action\" key and an \"action_input\" key, or with `Final Answer: <answer>`.";

fn fenced_block(text: &str) -> Result<&'static Regex, ParseError> {
    static CELL: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```"))
        .as_ref()
        .map_err(|err| {
            ParseError::new(
                ParseErrorKind::Generic,
                format!("invalid fenced block pattern: {err}"),
                text,
                FORMAT_HINT,
            )
        })
}

/// Parser for JSON blob actions wrapped in a fenced code block:
///
/// ````text
/// Action:
/// ```
/// {"action": "search", "action_input": "weather in SF"}
/// ```
/// ````
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonBlobOutputParser;

impl JsonBlobOutputParser {
    pub fn parse(&self, text: &str) -> Result<AgentStep, ParseError> {
        let includes_answer = text.contains(FINAL_ANSWER_ACTION);
        let blob = fenced_block(text)?
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim());

        let failure = match blob.map(|blob| parse_blob(blob, text)) {
            Some(Ok(AgentStep::Action(action))) => {
                if includes_answer {
                    return Err(ParseError::new(
                        ParseErrorKind::ConflictingFinalAndAction,
                        "output contains both a final answer and a parse-able action",
                        text,
                        FORMAT_HINT,
                    ));
                }
                return Ok(AgentStep::Action(action));
            }
            Some(Ok(finish)) => return Ok(finish),
            Some(Err(reason)) => Some(reason),
            None => None,
        };

        if let Some(answer) = final_answer_text(text) {
            return Ok(AgentStep::Finish(AgentFinish::new(answer, text)));
        }

        Err(match failure {
            Some(reason) => ParseError::new(ParseErrorKind::MalformedJson, reason, text, FORMAT_HINT),
            None => ParseError::new(
                ParseErrorKind::MissingAction,
                "no fenced $JSON_BLOB action found",
                text,
                FORMAT_HINT,
            ),
        })
    }
}

fn parse_blob(blob: &str, text: &str) -> Result<AgentStep, String> {
    let value: Value =
        serde_json::from_str(blob).map_err(|err| format!("action blob is not valid JSON: {err}"))?;
    let Value::Object(mut fields) = value else {
        return Err("action blob must be a JSON object".to_string());
    };

    let action = match fields.remove("action") {
        Some(Value::String(action)) => action,
        Some(_) => return Err("\"action\" must be a string".to_string()),
        None => return Err("action blob is missing the \"action\" key".to_string()),
    };
    let action_input = fields
        .remove("action_input")
        .ok_or_else(|| "action blob is missing the \"action_input\" key".to_string())?;

    if action.trim() == FINAL_ANSWER_TOOL {
        return Ok(AgentStep::Finish(AgentFinish::new(
            value_to_text(&action_input),
            text,
        )));
    }

    Ok(AgentStep::Action(AgentAction::new(
        action.trim(),
        action_input,
        text,
    )))
}
