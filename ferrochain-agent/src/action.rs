use std::collections::BTreeMap;

use ferrochain_core::{value_to_text, Value};
use serde::{Deserialize, Serialize};

/// Key every [`AgentFinish`] carries its answer under.
pub const OUTPUT_KEY: &str = "output";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentAction {
    pub tool: String,
    pub tool_input: Value,
    /// Raw model text the action was parsed from.
    pub log: String,
}

impl AgentAction {
    pub fn new(tool: impl Into<String>, tool_input: Value, log: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            tool_input,
            log: log.into(),
        }
    }

    pub fn tool_input_text(&self) -> String {
        value_to_text(&self.tool_input)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentFinish {
    pub return_values: BTreeMap<String, String>,
    pub log: String,
}

impl AgentFinish {
    pub fn new(output: impl Into<String>, log: impl Into<String>) -> Self {
        Self {
            return_values: BTreeMap::from([(OUTPUT_KEY.to_string(), output.into())]),
            log: log.into(),
        }
    }

    pub fn output(&self) -> &str {
        self.return_values
            .get(OUTPUT_KEY)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Outcome of one planning step: exactly one of continue or finish.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AgentStep {
    Action(AgentAction),
    Finish(AgentFinish),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntermediateStep {
    pub action: AgentAction,
    pub observation: String,
}

impl IntermediateStep {
    pub fn new(action: AgentAction, observation: impl Into<String>) -> Self {
        Self {
            action,
            observation: observation.into(),
        }
    }
}

/// Append-only transcript of one run, fed back into every planning prompt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scratchpad {
    steps: Vec<IntermediateStep>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<IntermediateStep>) -> Self {
        Self { steps }
    }

    pub fn push(&mut self, step: IntermediateStep) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[IntermediateStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<IntermediateStep> {
        self.steps
    }

    /// Renders every step as `<log>\n<observation_prefix><observation>\n<llm_prefix>`.
    pub fn render(&self, observation_prefix: &str, llm_prefix: &str) -> String {
        let mut thoughts = String::new();
        for step in &self.steps {
            thoughts.push_str(&step.action.log);
            thoughts.push('\n');
            thoughts.push_str(observation_prefix);
            thoughts.push_str(&step.observation);
            thoughts.push('\n');
            thoughts.push_str(llm_prefix);
        }
        thoughts
    }
}
