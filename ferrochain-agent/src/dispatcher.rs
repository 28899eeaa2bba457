use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use ferrochain_core::{Tool, ToolError, Value};

use crate::error::AgentError;

/// Stand-in for a tool name the registry does not know.
///
/// Invoking it never fails; it produces an observation telling the model to
/// pick another tool, so a bad name never interrupts a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTool {
    requested: String,
}

impl InvalidTool {
    pub fn new(requested: impl Into<String>) -> Self {
        Self {
            requested: requested.into(),
        }
    }

    pub fn requested(&self) -> &str {
        &self.requested
    }

    pub fn observation(&self) -> String {
        format!("{} is not a valid tool, try another one.", self.requested)
    }
}

#[derive(Clone)]
pub enum ResolvedTool {
    Registered(Arc<dyn Tool>),
    Invalid(InvalidTool),
}

impl ResolvedTool {
    pub fn name(&self) -> &str {
        match self {
            ResolvedTool::Registered(tool) => tool.name(),
            ResolvedTool::Invalid(invalid) => invalid.requested(),
        }
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, ResolvedTool::Registered(_))
    }

    pub fn return_direct(&self) -> bool {
        match self {
            ResolvedTool::Registered(tool) => tool.return_direct(),
            ResolvedTool::Invalid(_) => false,
        }
    }
}

impl std::fmt::Debug for ResolvedTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvedTool::Registered(tool) => {
                f.debug_tuple("Registered").field(&tool.name()).finish()
            }
            ResolvedTool::Invalid(invalid) => f.debug_tuple("Invalid").field(invalid).finish(),
        }
    }
}

struct Registry {
    ordered: Vec<Arc<dyn Tool>>,
    by_name: BTreeMap<String, Arc<dyn Tool>>,
}

/// Read-only tool registry resolving names to invocable tools.
///
/// Cloning shares the registry, so one dispatcher can serve many concurrent runs.
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<Registry>,
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolDispatcher {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Result<Self, AgentError> {
        let mut seen = HashSet::new();
        let mut by_name = BTreeMap::new();

        for tool in &tools {
            let name = tool.name();
            if name.trim().is_empty() {
                return Err(AgentError::InvalidToolName {
                    name: name.to_string(),
                });
            }

            if !seen.insert(name.to_string()) {
                return Err(AgentError::DuplicateToolName {
                    name: name.to_string(),
                });
            }

            by_name.insert(name.to_string(), Arc::clone(tool));
        }

        Ok(Self {
            registry: Arc::new(Registry {
                ordered: tools,
                by_name,
            }),
        })
    }

    /// Tools in registration order.
    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.registry.ordered
    }

    pub fn names(&self) -> Vec<&str> {
        self.registry
            .ordered
            .iter()
            .map(|tool| tool.name())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registry.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.ordered.is_empty()
    }

    pub fn resolve(&self, name: &str) -> ResolvedTool {
        match self.registry.by_name.get(name) {
            Some(tool) => ResolvedTool::Registered(Arc::clone(tool)),
            None => ResolvedTool::Invalid(InvalidTool::new(name)),
        }
    }

    /// Runs the resolved tool. Failures of a registered tool are returned
    /// untouched; the invalid-tool fallback always succeeds.
    pub async fn invoke(&self, tool: &ResolvedTool, input: Value) -> Result<String, ToolError> {
        match tool {
            ResolvedTool::Registered(tool) => {
                let input = if tool.single_input() {
                    unwrap_single_field(input)
                } else {
                    input
                };
                tool.invoke(input).await
            }
            ResolvedTool::Invalid(invalid) => Ok(invalid.observation()),
        }
    }
}

/// Single-input tools accept `{"field": value}` as shorthand for `value`.
fn unwrap_single_field(input: Value) -> Value {
    match input {
        Value::Object(fields) if fields.len() == 1 => fields
            .into_iter()
            .next()
            .map(|(_, value)| value)
            .unwrap_or(Value::Null),
        other => other,
    }
}
