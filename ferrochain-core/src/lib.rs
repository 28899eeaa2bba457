pub mod callbacks;
mod error;
mod fake;
mod llm;
mod runnable;
mod tool;
mod value;

pub use callbacks::{
    ensure_object, CallbackHandler, CallbackManager, LlmInput, LlmResult, RunContext, RunType,
    ToTraceInput,
};
pub use error::FerroError;
pub use fake::FakeListLlm;
pub use llm::{CompletionLlm, CompletionRequest};
pub use runnable::{Runnable, StreamEvent};
pub use tool::{Tool, ToolError};
pub use value::{value_to_text, Value};
