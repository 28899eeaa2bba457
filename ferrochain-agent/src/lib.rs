//! ReAct-style agent execution: a policy asks a completion model for the next
//! step, a parser turns its free text into an action or a final answer, and
//! the executor dispatches tools until the run ends or a budget runs out.

mod action;
mod config;
mod dispatcher;
mod error;
mod executor;
mod factory;
pub mod output_parser;
mod policy;
pub mod prompts;
mod tooling;

pub use action::{
    AgentAction, AgentFinish, AgentStep, IntermediateStep, Scratchpad, OUTPUT_KEY,
};
pub use config::{EarlyStoppingMethod, ExecutorConfig, ExecutorOptions};
pub use dispatcher::{InvalidTool, ResolvedTool, ToolDispatcher};
pub use error::AgentError;
pub use executor::{
    AgentExecutor, AgentExecutorBuilder, AgentInput, AgentIterator, AgentOutput, NextStep,
    RunStatus, EXCEPTION_TOOL,
};
pub use factory::{initialize_agent, AgentParts, AgentRegistry, AgentSettings};
pub use output_parser::{
    AgentOutputParser, JsonBlobOutputParser, ParseError, ParseErrorKind, ReActOutputParser,
};
pub use policy::{AgentPolicy, AgentPolicyBuilder, AgentType};
pub use tooling::{FnTool, StructuredTool, TypedTool};
