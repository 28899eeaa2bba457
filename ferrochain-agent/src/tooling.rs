use std::future::Future;
use std::sync::Arc;

use ferrochain_core::{value_to_text, Tool, ToolError, Value};
use futures::future::BoxFuture;
use futures::FutureExt;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

/// Multi-field tool with typed, schema-described arguments.
///
/// Wrap it in [`StructuredTool`] to register it with an agent.
#[async_trait::async_trait]
pub trait TypedTool: Send + Sync + 'static {
    type Args: DeserializeOwned + JsonSchema + Send;

    const NAME: &'static str;
    const DESCRIPTION: &'static str;
    const RETURN_DIRECT: bool = false;

    async fn run(&self, args: Self::Args) -> Result<String, ToolError>;
}

pub struct StructuredTool<T> {
    tool: T,
    schema: Value,
}

impl<T> StructuredTool<T>
where
    T: TypedTool,
{
    pub fn new(tool: T) -> Result<Self, ToolError> {
        let schema = serde_json::to_value(schemars::schema_for!(T::Args))?;
        Ok(Self { tool, schema })
    }

    pub fn into_arc(self) -> Arc<dyn Tool> {
        Arc::new(self)
    }
}

#[async_trait::async_trait]
impl<T> Tool for StructuredTool<T>
where
    T: TypedTool,
{
    fn name(&self) -> &str {
        T::NAME
    }

    fn description(&self) -> &str {
        T::DESCRIPTION
    }

    fn schema(&self) -> Value {
        self.schema.clone()
    }

    fn single_input(&self) -> bool {
        false
    }

    fn return_direct(&self) -> bool {
        T::RETURN_DIRECT
    }

    async fn invoke(&self, input: Value) -> Result<String, ToolError> {
        let args = match input {
            Value::String(raw) => serde_json::from_str::<T::Args>(&raw)?,
            other => serde_json::from_value::<T::Args>(other)?,
        };
        self.tool.run(args).await
    }
}

type ToolFn = Arc<dyn Fn(String) -> BoxFuture<'static, Result<String, ToolError>> + Send + Sync>;

/// Single-input tool backed by an async closure over the input text.
#[derive(Clone)]
pub struct FnTool {
    name: String,
    description: String,
    return_direct: bool,
    func: ToolFn,
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("return_direct", &self.return_direct)
            .finish()
    }
}

impl FnTool {
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, func: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            return_direct: false,
            func: Arc::new(move |input| func(input).boxed()),
        }
    }

    pub fn with_return_direct(mut self, return_direct: bool) -> Self {
        self.return_direct = return_direct;
        self
    }

    pub fn into_arc(self) -> Arc<dyn Tool> {
        Arc::new(self)
    }
}

#[async_trait::async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn return_direct(&self) -> bool {
        self.return_direct
    }

    async fn invoke(&self, input: Value) -> Result<String, ToolError> {
        (self.func)(value_to_text(&input)).await
    }
}
