use std::sync::Arc;
use std::time::Duration;

use ferrochain_agent::{
    initialize_agent, AgentError, AgentParts, AgentPolicy, AgentRegistry, AgentSettings,
    AgentType, EarlyStoppingMethod, ExecutorConfig, FnTool,
};
use ferrochain_core::{FakeListLlm, Tool};
use ferrochain_prompt::PromptTemplate;

fn echo_tool() -> Arc<dyn Tool> {
    FnTool::new("echo", "Repeats its input", |input: String| async move { Ok(input) }).into_arc()
}

#[test]
fn default_registry_covers_every_agent_type() {
    let registry = AgentRegistry::with_defaults();
    for agent_type in AgentType::ALL {
        assert!(registry.contains(agent_type));
    }
    assert_eq!(registry.agent_types().count(), AgentType::ALL.len());
}

#[test]
fn empty_registry_reports_unknown_agent_type() {
    let registry = AgentRegistry::empty();
    let err = registry
        .build_policy(
            AgentType::ChatZeroShotReactDescription,
            AgentParts::new(Arc::new(FakeListLlm::default()), vec![echo_tool()]),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        AgentError::UnknownAgentType(AgentType::ChatZeroShotReactDescription)
    ));
}

#[test]
fn registered_factory_replaces_the_default() {
    let mut registry = AgentRegistry::with_defaults();
    registry.register(AgentType::ZeroShotReactDescription, |parts| {
        AgentPolicy::builder(AgentType::ZeroShotReactDescription)
            .llm(parts.llm)
            .tools(parts.tools)
            .stop(vec!["END".to_string()])
            .build()
    });

    let policy = registry
        .build_policy(
            AgentType::ZeroShotReactDescription,
            AgentParts::new(Arc::new(FakeListLlm::default()), vec![echo_tool()]),
        )
        .unwrap();
    assert_eq!(policy.stop(), ["END".to_string()]);
}

#[test]
fn default_factory_honours_custom_prompts() {
    let registry = AgentRegistry::with_defaults();
    let parts = AgentParts::new(Arc::new(FakeListLlm::default()), vec![echo_tool()])
        .with_prompt(PromptTemplate::new(
            "{{tools}}\n{{input}}\n{{agent_scratchpad}}".to_string(),
        ));
    let policy = registry
        .build_policy(AgentType::ZeroShotReactDescription, parts)
        .unwrap();
    assert_eq!(
        policy.prompt().template(),
        "{{tools}}\n{{input}}\n{{agent_scratchpad}}"
    );
}

#[tokio::test]
async fn initialize_agent_builds_a_ready_executor() {
    let registry = AgentRegistry::with_defaults();
    let llm = Arc::new(FakeListLlm::new([
        "Action:\n```\n{\"action\": \"echo\", \"action_input\": \"hi\"}\n```",
        "Final Answer: hi",
    ]));
    let config = ExecutorConfig {
        max_iterations: Some(5),
        ..ExecutorConfig::default()
    };

    let executor = initialize_agent(
        &registry,
        AgentType::ChatZeroShotReactDescription,
        llm.clone(),
        vec![echo_tool()],
        config.clone(),
    )
    .unwrap();

    assert_eq!(executor.config(), &config);
    assert_eq!(executor.name(), "chat-zero-shot-react-description");
    assert_eq!(executor.run("say hi").await.unwrap(), "hi");
    assert_eq!(llm.call_count(), 2);
}

#[test]
fn initialize_agent_surfaces_construction_errors() {
    let registry = AgentRegistry::with_defaults();
    let llm = Arc::new(FakeListLlm::default());
    let nameless = FnTool::new("", "Has no name", |input: String| async move { Ok(input) });

    let err = initialize_agent(
        &registry,
        AgentType::ZeroShotReactDescription,
        llm.clone(),
        vec![nameless.into_arc()],
        ExecutorConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, AgentError::InvalidToolName { .. }));
    assert_eq!(llm.call_count(), 0);
}

#[test]
fn settings_parse_from_json() {
    let settings = AgentSettings::from_json(
        r#"{
            "agent": "structured-chat-zero-shot-react-description",
            "executor": {
                "max_iterations": 4,
                "max_execution_time_secs": 2.5,
                "early_stopping_method": "generate",
                "return_intermediate_steps": true
            }
        }"#,
    )
    .unwrap();

    assert_eq!(settings.agent, AgentType::StructuredChatZeroShotReactDescription);
    assert_eq!(settings.executor.max_iterations, Some(4));
    assert_eq!(
        settings.executor.max_execution_time,
        Some(Duration::from_millis(2500))
    );
    assert_eq!(
        settings.executor.early_stopping_method,
        EarlyStoppingMethod::Generate
    );
    assert!(settings.executor.return_intermediate_steps);
    assert_eq!(settings.executor.max_consecutive_parse_errors, None);
}

#[test]
fn settings_default_the_executor_section() {
    let settings = AgentSettings::from_json(r#"{"agent": "zero-shot-react-description"}"#).unwrap();
    assert_eq!(settings, AgentSettings::new(AgentType::ZeroShotReactDescription));
    assert_eq!(settings.executor.max_iterations, Some(15));
}

#[test]
fn settings_reject_unknown_agents_and_bad_durations() {
    let err = AgentSettings::from_json(r#"{"agent": "self-ask-with-search"}"#).unwrap_err();
    assert!(matches!(err, AgentError::InvalidConfig(_)));

    let err = AgentSettings::from_json(
        r#"{"agent": "zero-shot-react-description", "executor": {"max_execution_time_secs": -1}}"#,
    )
    .unwrap_err();
    assert!(matches!(err, AgentError::InvalidConfig(_)));
}

#[tokio::test]
async fn settings_initialize_an_executor() {
    let settings = AgentSettings::from_json(
        r#"{"agent": "zero-shot-react-description", "executor": {"max_iterations": 1}}"#,
    )
    .unwrap();
    let llm = Arc::new(FakeListLlm::new(["Action: echo\nAction Input: hi"]));

    let executor = settings
        .initialize(&AgentRegistry::with_defaults(), llm.clone(), vec![echo_tool()])
        .unwrap();
    let output = executor.invoke("q").await.unwrap();

    assert!(output.status.is_early_stop());
    assert_eq!(llm.call_count(), 1);
}
