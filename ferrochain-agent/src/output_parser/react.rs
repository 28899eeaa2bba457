use std::sync::OnceLock;

use ferrochain_core::Value;
use regex::Regex;

use super::{final_answer_text, ParseError, ParseErrorKind, FINAL_ANSWER_ACTION};
use crate::action::{AgentAction, AgentFinish, AgentStep};

const ACTION_BLOCK: &str = r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)";
const ACTION_NAME: &str = r"(?s)Action\s*\d*\s*:[\s]*(.*?)";
const ACTION_INPUT: &str = r"(?s)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)";

const FORMAT_HINT: &str = "Respond with `Action: <tool name>` followed by `Action Input: <tool input>` on the next line, or with `Final Answer: <answer>`.";

type Grammar = OnceLock<Result<Regex, regex::Error>>;

fn compiled(
    cell: &'static Grammar,
    pattern: &str,
    text: &str,
) -> Result<&'static Regex, ParseError> {
    cell.get_or_init(|| Regex::new(pattern))
        .as_ref()
        .map_err(|err| {
            ParseError::new(
                ParseErrorKind::Generic,
                format!("invalid action grammar: {err}"),
                text,
                FORMAT_HINT,
            )
        })
}

fn action_block(text: &str) -> Result<&'static Regex, ParseError> {
    static CELL: Grammar = OnceLock::new();
    compiled(&CELL, ACTION_BLOCK, text)
}

fn action_name(text: &str) -> Result<&'static Regex, ParseError> {
    static CELL: Grammar = OnceLock::new();
    compiled(&CELL, ACTION_NAME, text)
}

fn action_input(text: &str) -> Result<&'static Regex, ParseError> {
    static CELL: Grammar = OnceLock::new();
    compiled(&CELL, ACTION_INPUT, text)
}

/// Parser for the ReAct text grammar:
///
/// ```text
/// Thought: I should look this up
/// Action: search
/// Action Input: "rust borrow checker"
/// ```
///
/// Numbered variants (`Action 2:` / `Action Input 2:`) are accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReActOutputParser;

impl ReActOutputParser {
    pub fn parse(&self, text: &str) -> Result<AgentStep, ParseError> {
        let includes_answer = text.contains(FINAL_ANSWER_ACTION);

        if let Some(caps) = action_block(text)?.captures(text) {
            if includes_answer {
                return Err(ParseError::new(
                    ParseErrorKind::ConflictingFinalAndAction,
                    "output contains both a final answer and a parse-able action",
                    text,
                    FORMAT_HINT,
                ));
            }

            let tool = caps[1].trim();
            let tool_input = strip_wrapping_quotes(caps[2].trim());
            return Ok(AgentStep::Action(AgentAction::new(
                tool,
                Value::String(tool_input.to_string()),
                text,
            )));
        }

        if let Some(answer) = final_answer_text(text) {
            return Ok(AgentStep::Finish(AgentFinish::new(answer, text)));
        }

        if !action_name(text)?.is_match(text) {
            return Err(ParseError::new(
                ParseErrorKind::MissingAction,
                "Missing 'Action:' after 'Thought:'",
                text,
                FORMAT_HINT,
            ));
        }

        if !action_input(text)?.is_match(text) {
            return Err(ParseError::new(
                ParseErrorKind::MissingActionInput,
                "Missing 'Action Input:' after 'Action:'",
                text,
                FORMAT_HINT,
            ));
        }

        Err(ParseError::new(
            ParseErrorKind::Generic,
            format!("Could not parse model output: `{text}`"),
            text,
            FORMAT_HINT,
        ))
    }
}

/// Removes one layer of surrounding double quotes. SQL statements are kept
/// verbatim so quoted identifiers survive.
fn strip_wrapping_quotes(input: &str) -> &str {
    if input.starts_with("SELECT ") {
        return input;
    }
    input
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(input)
}
