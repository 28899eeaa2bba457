use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ferrochain_core::{CompletionLlm, Tool};
use ferrochain_prompt::PromptTemplate;
use serde::{Deserialize, Serialize};

use crate::config::ExecutorConfig;
use crate::error::AgentError;
use crate::executor::AgentExecutor;
use crate::policy::{AgentPolicy, AgentType};

/// Everything a factory needs to assemble a policy.
pub struct AgentParts {
    pub llm: Arc<dyn CompletionLlm>,
    pub tools: Vec<Arc<dyn Tool>>,
    pub prompt: Option<PromptTemplate>,
}

impl AgentParts {
    pub fn new(llm: Arc<dyn CompletionLlm>, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            llm,
            tools,
            prompt: None,
        }
    }

    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = Some(prompt);
        self
    }
}

type AgentFactory = Box<dyn Fn(AgentParts) -> Result<AgentPolicy, AgentError> + Send + Sync>;

/// Maps each [`AgentType`] to the factory that builds its policy.
#[derive(Default)]
pub struct AgentRegistry {
    factories: BTreeMap<AgentType, AgentFactory>,
}

impl fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agent_types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AgentRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for agent_type in AgentType::ALL {
            registry.register(agent_type, move |parts| default_policy(agent_type, parts));
        }
        registry
    }

    /// Registers `factory` for `agent_type`, replacing any previous one.
    pub fn register<F>(&mut self, agent_type: AgentType, factory: F)
    where
        F: Fn(AgentParts) -> Result<AgentPolicy, AgentError> + Send + Sync + 'static,
    {
        self.factories.insert(agent_type, Box::new(factory));
    }

    pub fn contains(&self, agent_type: AgentType) -> bool {
        self.factories.contains_key(&agent_type)
    }

    pub fn agent_types(&self) -> impl Iterator<Item = AgentType> + '_ {
        self.factories.keys().copied()
    }

    pub fn build_policy(
        &self,
        agent_type: AgentType,
        parts: AgentParts,
    ) -> Result<AgentPolicy, AgentError> {
        let factory = self
            .factories
            .get(&agent_type)
            .ok_or(AgentError::UnknownAgentType(agent_type))?;
        factory(parts)
    }
}

fn default_policy(agent_type: AgentType, parts: AgentParts) -> Result<AgentPolicy, AgentError> {
    let mut builder = AgentPolicy::builder(agent_type)
        .llm(parts.llm)
        .tools(parts.tools);
    if let Some(prompt) = parts.prompt {
        builder = builder.prompt(prompt);
    }
    builder.build()
}

/// Builds the policy for `agent_type` and wraps it in an executor.
pub fn initialize_agent(
    registry: &AgentRegistry,
    agent_type: AgentType,
    llm: Arc<dyn CompletionLlm>,
    tools: Vec<Arc<dyn Tool>>,
    config: ExecutorConfig,
) -> Result<AgentExecutor, AgentError> {
    let policy = registry.build_policy(agent_type, AgentParts::new(llm, tools))?;
    tracing::debug!(agent = %agent_type, tools = policy.dispatcher().len(), "agent initialized");
    Ok(AgentExecutor::new(policy, config))
}

/// Serializable selection of an agent variant plus its executor limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    pub agent: AgentType,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

impl AgentSettings {
    pub fn new(agent: AgentType) -> Self {
        Self {
            agent,
            executor: ExecutorConfig::default(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, AgentError> {
        serde_json::from_str(raw)
            .map_err(|err| AgentError::InvalidConfig(format!("invalid agent settings: {err}")))
    }

    pub fn initialize(
        &self,
        registry: &AgentRegistry,
        llm: Arc<dyn CompletionLlm>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Result<AgentExecutor, AgentError> {
        initialize_agent(registry, self.agent, llm, tools, self.executor.clone())
    }
}
