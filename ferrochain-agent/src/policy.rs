use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ferrochain_core::{
    ensure_object, CallbackManager, CompletionLlm, CompletionRequest, LlmInput, LlmResult,
    RunContext, RunType, Tool, Value,
};
use ferrochain_prompt::PromptTemplate;
use serde::{Deserialize, Serialize};

use crate::action::{AgentStep, Scratchpad};
use crate::dispatcher::ToolDispatcher;
use crate::error::AgentError;
use crate::output_parser::AgentOutputParser;
use crate::prompts::{
    PromptLayout, CHAT_ZERO_SHOT_REACT, FINAL_ANSWER_INSTRUCTION, LLM_PREFIX, OBSERVATION_PREFIX,
    STRUCTURED_CHAT_ZERO_SHOT_REACT, ZERO_SHOT_REACT,
};

pub const INPUT_KEY: &str = "input";
pub const SCRATCHPAD_KEY: &str = "agent_scratchpad";
pub const TOOLS_KEY: &str = "tools";
pub const TOOL_NAMES_KEY: &str = "tool_names";

/// Agent variants. Each one fixes a prompt layout, an output grammar and the
/// kind of tools it accepts; they all share [`AgentPolicy::plan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentType {
    #[serde(rename = "zero-shot-react-description")]
    ZeroShotReactDescription,
    #[serde(rename = "chat-zero-shot-react-description")]
    ChatZeroShotReactDescription,
    #[serde(rename = "structured-chat-zero-shot-react-description")]
    StructuredChatZeroShotReactDescription,
}

impl AgentType {
    pub const ALL: [AgentType; 3] = [
        AgentType::ZeroShotReactDescription,
        AgentType::ChatZeroShotReactDescription,
        AgentType::StructuredChatZeroShotReactDescription,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::ZeroShotReactDescription => "zero-shot-react-description",
            AgentType::ChatZeroShotReactDescription => "chat-zero-shot-react-description",
            AgentType::StructuredChatZeroShotReactDescription => {
                "structured-chat-zero-shot-react-description"
            }
        }
    }

    pub fn layout(&self) -> &'static PromptLayout {
        match self {
            AgentType::ZeroShotReactDescription => &ZERO_SHOT_REACT,
            AgentType::ChatZeroShotReactDescription => &CHAT_ZERO_SHOT_REACT,
            AgentType::StructuredChatZeroShotReactDescription => &STRUCTURED_CHAT_ZERO_SHOT_REACT,
        }
    }

    pub fn output_parser(&self) -> AgentOutputParser {
        match self {
            AgentType::ZeroShotReactDescription => AgentOutputParser::react(),
            AgentType::ChatZeroShotReactDescription
            | AgentType::StructuredChatZeroShotReactDescription => AgentOutputParser::json_blob(),
        }
    }

    pub fn default_stop(&self) -> Vec<String> {
        match self {
            AgentType::ZeroShotReactDescription => {
                vec!["\nObservation:".to_string(), "\n\tObservation:".to_string()]
            }
            AgentType::ChatZeroShotReactDescription
            | AgentType::StructuredChatZeroShotReactDescription => {
                vec!["Observation:".to_string()]
            }
        }
    }

    pub fn allows_multi_input(&self) -> bool {
        matches!(self, AgentType::StructuredChatZeroShotReactDescription)
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = AgentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        AgentType::ALL
            .into_iter()
            .find(|agent_type| agent_type.as_str() == value)
            .ok_or_else(|| AgentError::InvalidConfig(format!("unknown agent type: {value}")))
    }
}

/// Callback context of the run a planning call belongs to.
#[derive(Clone, Copy)]
pub(crate) struct RunTrace<'a> {
    pub callbacks: &'a CallbackManager,
    pub parent: &'a RunContext,
}

/// Builds one planning prompt, asks the model, and parses its reply.
pub struct AgentPolicy {
    agent_type: AgentType,
    llm: Arc<dyn CompletionLlm>,
    dispatcher: ToolDispatcher,
    prompt: PromptTemplate,
    tool_catalog: String,
    tool_names: String,
    parser: AgentOutputParser,
    stop: Vec<String>,
}

impl fmt::Debug for AgentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentPolicy")
            .field("agent_type", &self.agent_type)
            .field("model", &self.llm.model_name())
            .field("tools", &self.dispatcher.names())
            .field("stop", &self.stop)
            .finish()
    }
}

impl AgentPolicy {
    pub fn builder(agent_type: AgentType) -> AgentPolicyBuilder {
        AgentPolicyBuilder {
            agent_type,
            llm: None,
            tools: Vec::new(),
            prompt: None,
            stop: None,
        }
    }

    pub fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    pub fn prompt(&self) -> &PromptTemplate {
        &self.prompt
    }

    pub fn stop(&self) -> &[String] {
        &self.stop
    }

    pub fn parser(&self) -> AgentOutputParser {
        self.parser
    }

    /// Renders the prompt the next planning call would send.
    pub fn render_prompt(
        &self,
        scratchpad: &Scratchpad,
        objective: &str,
    ) -> Result<String, AgentError> {
        self.assemble(&self.thoughts(scratchpad, false), objective)
    }

    /// One planning step. `stop` extends the variant's stop tokens.
    pub async fn plan(
        &self,
        scratchpad: &Scratchpad,
        objective: &str,
        stop: Option<&[String]>,
    ) -> Result<AgentStep, AgentError> {
        self.plan_traced(scratchpad, objective, stop, false, None)
            .await
    }

    /// The single extra planning call made when a run stops early with the
    /// `generate` method: the model is asked for its best final answer now.
    pub async fn plan_final(
        &self,
        scratchpad: &Scratchpad,
        objective: &str,
        stop: Option<&[String]>,
    ) -> Result<AgentStep, AgentError> {
        self.plan_traced(scratchpad, objective, stop, true, None)
            .await
    }

    pub(crate) async fn plan_traced(
        &self,
        scratchpad: &Scratchpad,
        objective: &str,
        stop: Option<&[String]>,
        final_call: bool,
        trace: Option<RunTrace<'_>>,
    ) -> Result<AgentStep, AgentError> {
        let prompt = self.assemble(&self.thoughts(scratchpad, final_call), objective)?;

        let mut stop_tokens = self.stop.clone();
        for token in stop.unwrap_or_default() {
            if !stop_tokens.contains(token) {
                stop_tokens.push(token.clone());
            }
        }

        tracing::debug!(
            agent = %self.agent_type,
            steps = scratchpad.len(),
            final_call,
            "planning step"
        );

        let text = self.predict(prompt, stop_tokens, trace).await?;
        Ok(self.parser.parse(&text)?)
    }

    fn thoughts(&self, scratchpad: &Scratchpad, final_call: bool) -> String {
        let mut thoughts = scratchpad.render(OBSERVATION_PREFIX, LLM_PREFIX);
        if let Some(preamble) = self.agent_type.layout().scratchpad_preamble {
            if !thoughts.is_empty() {
                thoughts.insert_str(0, preamble);
            }
        }
        if final_call {
            thoughts.push_str(FINAL_ANSWER_INSTRUCTION);
        }
        thoughts
    }

    fn assemble(&self, thoughts: &str, objective: &str) -> Result<String, AgentError> {
        let vars = HashMap::from([
            (TOOLS_KEY.to_string(), Value::String(self.tool_catalog.clone())),
            (TOOL_NAMES_KEY.to_string(), Value::String(self.tool_names.clone())),
            (INPUT_KEY.to_string(), Value::String(objective.to_string())),
            (SCRATCHPAD_KEY.to_string(), Value::String(thoughts.to_string())),
        ]);
        self.prompt
            .render(&vars)
            .map_err(|err| AgentError::InvalidPrompt(err.to_string()))
    }

    async fn predict(
        &self,
        prompt: String,
        stop: Vec<String>,
        trace: Option<RunTrace<'_>>,
    ) -> Result<String, AgentError> {
        let request = CompletionRequest::new(prompt).with_stop(stop);
        let trace = match trace {
            Some(trace) if !trace.callbacks.is_noop() => trace,
            _ => return self.llm.complete(request).await.map_err(AgentError::Model),
        };

        let model = self.llm.model_name().to_string();
        let ctx = trace.parent.child(RunType::Llm, model.clone());
        let input = LlmInput {
            model: model.clone(),
            prompt: request.prompt.clone(),
            stop_sequences: request.stop.clone(),
        };
        trace.callbacks.on_llm_start(&ctx, &input).await;

        match self.llm.complete(request).await {
            Ok(text) => {
                let result = LlmResult {
                    model,
                    generations: vec![text.clone()],
                };
                trace
                    .callbacks
                    .on_llm_end(&ctx, &result, ctx.elapsed_ms())
                    .await;
                Ok(text)
            }
            Err(err) => {
                let error = ensure_object(Value::String(err.to_string()));
                trace.callbacks.on_error(&ctx, &error, ctx.elapsed_ms()).await;
                Err(AgentError::Model(err))
            }
        }
    }
}

pub struct AgentPolicyBuilder {
    agent_type: AgentType,
    llm: Option<Arc<dyn CompletionLlm>>,
    tools: Vec<Arc<dyn Tool>>,
    prompt: Option<PromptTemplate>,
    stop: Option<Vec<String>>,
}

impl AgentPolicyBuilder {
    pub fn llm(mut self, llm: Arc<dyn CompletionLlm>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools = tools;
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Replaces the variant's default prompt. It may use `{{tools}}`,
    /// `{{tool_names}}`, `{{input}}` and `{{agent_scratchpad}}`.
    pub fn prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Replaces the variant's default stop tokens.
    pub fn stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn build(self) -> Result<AgentPolicy, AgentError> {
        let agent_type = self.agent_type;
        let llm = self
            .llm
            .ok_or_else(|| AgentError::InvalidConfig("missing llm".to_string()))?;

        validate_tools(agent_type, &self.tools)?;
        let tool_catalog = render_catalog(agent_type, &self.tools);
        let tool_names = self
            .tools
            .iter()
            .map(|tool| tool.name())
            .collect::<Vec<_>>()
            .join(", ");
        let dispatcher = ToolDispatcher::new(self.tools)?;

        let prompt = match self.prompt {
            Some(custom) => validate_prompt(custom)?,
            None => agent_type.layout().template(),
        };

        Ok(AgentPolicy {
            agent_type,
            llm,
            dispatcher,
            prompt,
            tool_catalog,
            tool_names,
            parser: agent_type.output_parser(),
            stop: self.stop.unwrap_or_else(|| agent_type.default_stop()),
        })
    }
}

fn validate_tools(agent_type: AgentType, tools: &[Arc<dyn Tool>]) -> Result<(), AgentError> {
    for tool in tools {
        if tool.description().trim().is_empty() {
            return Err(AgentError::ToolMissingDescription {
                name: tool.name().to_string(),
            });
        }

        if !tool.single_input() && !agent_type.allows_multi_input() {
            return Err(AgentError::MultiInputToolUnsupported {
                agent: agent_type,
                name: tool.name().to_string(),
            });
        }
    }
    Ok(())
}

fn validate_prompt(prompt: PromptTemplate) -> Result<PromptTemplate, AgentError> {
    let variables = prompt
        .input_variables()
        .map_err(|err| AgentError::InvalidPrompt(err.to_string()))?;

    if !variables.contains(INPUT_KEY) {
        return Err(AgentError::InvalidPrompt(format!(
            "prompt must reference {{{{{INPUT_KEY}}}}}"
        )));
    }

    if !variables.contains(SCRATCHPAD_KEY) {
        tracing::warn!(
            "prompt is missing {{{{agent_scratchpad}}}}; appending it to the end of the template"
        );
        return Ok(prompt.append(&format!("\n{{{{{SCRATCHPAD_KEY}}}}}")));
    }

    Ok(prompt)
}

fn render_catalog(agent_type: AgentType, tools: &[Arc<dyn Tool>]) -> String {
    tools
        .iter()
        .map(|tool| {
            if agent_type.allows_multi_input() {
                let schema = tool.schema();
                let args = schema.get("properties").cloned().unwrap_or(schema);
                format!("{}: {}, args: {}", tool.name(), tool.description(), args)
            } else {
                format!("{}: {}", tool.name(), tool.description())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
