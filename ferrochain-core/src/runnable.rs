use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{FerroError, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    AgentAction {
        tool: String,
        tool_input: Value,
        log: String,
    },
    Observation {
        tool: String,
        observation: String,
    },
    FinalAnswer(String),
    Metadata {
        key: String,
        value: Value,
    },
}

#[async_trait]
pub trait Runnable<Input: Send + 'static, Output: Send + 'static> {
    async fn invoke(&self, input: Input) -> Result<Output, FerroError>;

    fn stream(&self, input: Input) -> BoxStream<'_, Result<StreamEvent, FerroError>>;
}
