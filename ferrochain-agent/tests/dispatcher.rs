use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ferrochain_agent::{AgentError, ResolvedTool, ToolDispatcher};
use ferrochain_core::{Tool, ToolError, Value};
use serde_json::json;

struct RecordingTool {
    name: &'static str,
    seen: Arc<Mutex<Vec<Value>>>,
}

impl RecordingTool {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "records its input"
    }

    async fn invoke(&self, input: Value) -> Result<String, ToolError> {
        self.seen.lock().unwrap().push(input.clone());
        Ok(format!("{} saw {}", self.name, input))
    }
}

struct BrokenTool;

#[async_trait]
impl Tool for BrokenTool {
    fn name(&self) -> &str {
        "broken"
    }

    fn description(&self) -> &str {
        "always fails"
    }

    async fn invoke(&self, _input: Value) -> Result<String, ToolError> {
        Err(ToolError::ExecutionFailed("disk on fire".to_string()))
    }
}

#[tokio::test]
async fn unknown_tool_resolves_to_invalid_tool_observation() {
    let dispatcher = ToolDispatcher::new(vec![Arc::new(RecordingTool::new("search"))]).unwrap();

    let resolved = dispatcher.resolve("calculator");
    assert!(!resolved.is_registered());
    assert_eq!(resolved.name(), "calculator");

    let observation = dispatcher.invoke(&resolved, json!("1 + 1")).await.unwrap();
    assert_eq!(observation, "calculator is not a valid tool, try another one.");
}

#[tokio::test]
async fn registered_tool_receives_input() {
    let tool = RecordingTool::new("search");
    let seen = tool.seen.clone();
    let dispatcher = ToolDispatcher::new(vec![Arc::new(tool)]).unwrap();

    let resolved = dispatcher.resolve("search");
    assert!(matches!(resolved, ResolvedTool::Registered(_)));

    let observation = dispatcher.invoke(&resolved, json!("rust")).await.unwrap();
    assert_eq!(observation, "search saw \"rust\"");
    assert_eq!(*seen.lock().unwrap(), vec![json!("rust")]);
}

#[tokio::test]
async fn single_input_tool_unwraps_one_field_objects() {
    let tool = RecordingTool::new("search");
    let seen = tool.seen.clone();
    let dispatcher = ToolDispatcher::new(vec![Arc::new(tool)]).unwrap();

    let resolved = dispatcher.resolve("search");
    dispatcher
        .invoke(&resolved, json!({"query": "rust"}))
        .await
        .unwrap();
    dispatcher
        .invoke(&resolved, json!({"a": 1, "b": 2}))
        .await
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![json!("rust"), json!({"a": 1, "b": 2})]
    );
}

#[tokio::test]
async fn tool_failures_are_returned_unchanged() {
    let dispatcher = ToolDispatcher::new(vec![Arc::new(BrokenTool)]).unwrap();
    let err = dispatcher
        .invoke(&dispatcher.resolve("broken"), json!("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::ExecutionFailed(reason) if reason == "disk on fire"));
}

#[test]
fn duplicate_names_are_rejected() {
    let err = ToolDispatcher::new(vec![
        Arc::new(RecordingTool::new("search")),
        Arc::new(RecordingTool::new("search")),
    ])
    .unwrap_err();
    assert!(matches!(err, AgentError::DuplicateToolName { name } if name == "search"));
}

#[test]
fn blank_names_are_rejected() {
    let err = ToolDispatcher::new(vec![Arc::new(RecordingTool::new("  "))]).unwrap_err();
    assert!(matches!(err, AgentError::InvalidToolName { .. }));
    assert!(err.is_construction());
}

#[test]
fn registry_keeps_declaration_order() {
    let dispatcher = ToolDispatcher::new(vec![
        Arc::new(RecordingTool::new("zeta")),
        Arc::new(RecordingTool::new("alpha")),
    ])
    .unwrap();
    assert_eq!(dispatcher.names(), vec!["zeta", "alpha"]);
    assert_eq!(dispatcher.len(), 2);
    assert!(!dispatcher.is_empty());
}
