// Import commonly used types with: `use ferrochain::prelude::*;`

pub use ferrochain_core::{
    // Callbacks
    CallbackHandler,
    CallbackManager,
    // Model contract
    CompletionLlm,
    CompletionRequest,
    FakeListLlm,
    // Errors
    FerroError,
    RunContext,
    RunType,
    // Core traits
    Runnable,
    StreamEvent,
    // Tools
    Tool,
    ToolError,

    Value,
};
pub use ferrochain_prompt::PromptTemplate;

#[cfg(feature = "agent")]
pub use ferrochain_agent::{
    initialize_agent, AgentError, AgentExecutor, AgentInput, AgentOutput, AgentPolicy,
    AgentRegistry, AgentSettings, AgentStep, AgentType, EarlyStoppingMethod, ExecutorConfig,
    ExecutorOptions, FnTool, RunStatus, StructuredTool, TypedTool,
};
