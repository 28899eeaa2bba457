use std::sync::Arc;

use async_trait::async_trait;
use ferrochain_agent::prompts::FINAL_ANSWER_INSTRUCTION;
use ferrochain_agent::{
    AgentAction, AgentError, AgentPolicy, AgentStep, AgentType, FnTool, IntermediateStep,
    ParseErrorKind, Scratchpad, StructuredTool, TypedTool,
};
use ferrochain_core::{FakeListLlm, FerroError, Tool, ToolError};
use ferrochain_prompt::PromptTemplate;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

fn search_tool() -> Arc<dyn Tool> {
    FnTool::new("search", "Looks things up on the web", |query: String| async move {
        Ok(format!("results for {query}"))
    })
    .into_arc()
}

fn calculator_tool() -> Arc<dyn Tool> {
    FnTool::new("calculator", "Does arithmetic", |expr: String| async move { Ok(expr) })
        .into_arc()
}

#[derive(Debug, Deserialize, JsonSchema)]
struct FlightArgs {
    origin: String,
    destination: String,
}

struct Flights;

#[async_trait]
impl TypedTool for Flights {
    type Args = FlightArgs;

    const NAME: &'static str = "flights";
    const DESCRIPTION: &'static str = "Finds flights between two airports";

    async fn run(&self, args: Self::Args) -> Result<String, ToolError> {
        Ok(format!("{} -> {}", args.origin, args.destination))
    }
}

fn policy(agent_type: AgentType, llm: Arc<FakeListLlm>, tools: Vec<Arc<dyn Tool>>) -> AgentPolicy {
    AgentPolicy::builder(agent_type)
        .llm(llm)
        .tools(tools)
        .build()
        .unwrap()
}

#[test]
fn agent_type_names_round_trip() {
    for agent_type in AgentType::ALL {
        assert_eq!(agent_type.as_str().parse::<AgentType>().unwrap(), agent_type);
        assert_eq!(
            serde_json::to_value(agent_type).unwrap(),
            json!(agent_type.to_string())
        );
    }
    assert!(matches!(
        "openai-functions".parse::<AgentType>(),
        Err(AgentError::InvalidConfig(_))
    ));
}

#[test]
fn empty_description_fails_construction() {
    let llm = Arc::new(FakeListLlm::new(["Final Answer: never"]));
    let blank = FnTool::new("blank", "   ", |input: String| async move { Ok(input) }).into_arc();

    let err = AgentPolicy::builder(AgentType::ZeroShotReactDescription)
        .llm(llm.clone())
        .tools(vec![search_tool(), blank])
        .build()
        .unwrap_err();

    assert!(matches!(err, AgentError::ToolMissingDescription { name } if name == "blank"));
    assert_eq!(llm.call_count(), 0);
}

#[test]
fn multi_input_tools_need_the_structured_variant() {
    let flights = StructuredTool::new(Flights).unwrap().into_arc();

    for agent_type in [
        AgentType::ZeroShotReactDescription,
        AgentType::ChatZeroShotReactDescription,
    ] {
        let err = AgentPolicy::builder(agent_type)
            .llm(Arc::new(FakeListLlm::default()))
            .tool(flights.clone())
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            AgentError::MultiInputToolUnsupported { agent, name } if agent == agent_type && name == "flights"
        ));
    }

    AgentPolicy::builder(AgentType::StructuredChatZeroShotReactDescription)
        .llm(Arc::new(FakeListLlm::default()))
        .tool(flights)
        .build()
        .unwrap();
}

#[test]
fn missing_llm_is_a_config_error() {
    let err = AgentPolicy::builder(AgentType::ZeroShotReactDescription)
        .tools(vec![search_tool()])
        .build()
        .unwrap_err();
    assert!(matches!(err, AgentError::InvalidConfig(_)));
}

#[tokio::test]
async fn zero_shot_prompt_lists_tools_and_uses_react_stop_tokens() {
    let llm = Arc::new(FakeListLlm::new(["Thought: easy\nFinal Answer: 4"]));
    let policy = policy(
        AgentType::ZeroShotReactDescription,
        llm.clone(),
        vec![search_tool(), calculator_tool()],
    );

    let step = policy
        .plan(&Scratchpad::new(), "what is 2 + 2?", None)
        .await
        .unwrap();
    assert!(matches!(step, AgentStep::Finish(ref finish) if finish.output() == "4"));

    let requests = llm.requests();
    assert_eq!(requests.len(), 1);
    let prompt = &requests[0].prompt;
    assert!(prompt.contains("search: Looks things up on the web\ncalculator: Does arithmetic"));
    assert!(prompt.contains("should be one of [search, calculator]"));
    assert!(prompt.ends_with("Question: what is 2 + 2?\nThought:"));
    assert_eq!(requests[0].stop, vec!["\nObservation:", "\n\tObservation:"]);
}

#[tokio::test]
async fn scratchpad_is_rendered_into_the_prompt() {
    let llm = Arc::new(FakeListLlm::new(["Final Answer: done"]));
    let policy = policy(AgentType::ZeroShotReactDescription, llm.clone(), vec![search_tool()]);

    let scratchpad = Scratchpad::from_steps(vec![IntermediateStep::new(
        AgentAction::new(
            "search",
            json!("rust"),
            " I should search\nAction: search\nAction Input: rust",
        ),
        "results for rust",
    )]);
    policy.plan(&scratchpad, "tell me about rust", None).await.unwrap();

    let prompt = &llm.prompts()[0];
    assert!(prompt.ends_with(
        "Question: tell me about rust\nThought: I should search\nAction: search\nAction Input: rust\nObservation: results for rust\nThought:"
    ));
}

#[tokio::test]
async fn run_stop_tokens_extend_the_defaults() {
    let llm = Arc::new(FakeListLlm::new(["Final Answer: ok"]));
    let policy = policy(AgentType::ZeroShotReactDescription, llm.clone(), vec![search_tool()]);

    let extra = vec!["\nQuestion:".to_string(), "\nObservation:".to_string()];
    policy
        .plan(&Scratchpad::new(), "q", Some(&extra))
        .await
        .unwrap();

    assert_eq!(
        llm.requests()[0].stop,
        vec!["\nObservation:", "\n\tObservation:", "\nQuestion:"]
    );
}

#[tokio::test]
async fn chat_variant_prefixes_previous_work_and_parses_json_blobs() {
    let llm = Arc::new(FakeListLlm::new([
        "Thought: search first\nAction:\n```\n{\"action\": \"search\", \"action_input\": \"rust\"}\n```",
    ]));
    let policy = policy(AgentType::ChatZeroShotReactDescription, llm.clone(), vec![search_tool()]);

    let empty = Scratchpad::new();
    let step = policy.plan(&empty, "find rust", None).await.unwrap();
    assert!(matches!(step, AgentStep::Action(ref action) if action.tool == "search"));
    assert!(!llm.prompts()[0].contains("This was your previous work"));
    assert_eq!(llm.requests()[0].stop, vec!["Observation:"]);

    let scratchpad = Scratchpad::from_steps(vec![IntermediateStep::new(
        AgentAction::new("search", json!("rust"), "searched"),
        "a language",
    )]);
    let rendered = policy.render_prompt(&scratchpad, "find rust").unwrap();
    assert!(rendered.contains(
        "This was your previous work (but I haven't seen any of it! I only see what you return as final answer):\nsearched\nObservation: a language\nThought:"
    ));
}

#[tokio::test]
async fn structured_variant_lists_argument_schemas() {
    let llm = Arc::new(FakeListLlm::new([
        "Action:\n```\n{\"action\": \"flights\", \"action_input\": {\"origin\": \"LIS\", \"destination\": \"OSL\"}}\n```",
    ]));
    let policy = policy(
        AgentType::StructuredChatZeroShotReactDescription,
        llm.clone(),
        vec![StructuredTool::new(Flights).unwrap().into_arc()],
    );

    let step = policy.plan(&Scratchpad::new(), "fly me", None).await.unwrap();
    match step {
        AgentStep::Action(action) => {
            assert_eq!(action.tool_input, json!({"origin": "LIS", "destination": "OSL"}));
        }
        other => panic!("expected action, got {other:?}"),
    }

    let prompt = &llm.prompts()[0];
    assert!(prompt.contains("flights: Finds flights between two airports, args: {"));
    assert!(prompt.contains("\"destination\""));
    assert!(prompt.contains("Valid \"action\" values: \"Final Answer\" or flights"));
}

#[tokio::test]
async fn plan_final_appends_the_final_answer_instruction() {
    let llm = Arc::new(FakeListLlm::new(["Final Answer: best guess"]));
    let policy = policy(AgentType::ZeroShotReactDescription, llm.clone(), vec![search_tool()]);

    let step = policy.plan_final(&Scratchpad::new(), "q", None).await.unwrap();
    assert!(matches!(step, AgentStep::Finish(ref finish) if finish.output() == "best guess"));
    assert!(llm.prompts()[0].ends_with(FINAL_ANSWER_INSTRUCTION));
}

#[tokio::test]
async fn unparseable_output_is_recoverable_and_model_errors_are_not() {
    let llm = Arc::new(FakeListLlm::new(["I have no idea"]));
    let policy = policy(AgentType::ZeroShotReactDescription, llm, vec![search_tool()]);

    let err = policy.plan(&Scratchpad::new(), "q", None).await.unwrap_err();
    assert!(err.is_recoverable());
    assert!(matches!(err, AgentError::OutputParsing(ref parse) if parse.kind == ParseErrorKind::MissingAction));

    let err = policy.plan(&Scratchpad::new(), "q", None).await.unwrap_err();
    assert!(!err.is_recoverable());
    assert!(matches!(err, AgentError::Model(FerroError::LlmProvider(_))));
}

#[test]
fn custom_prompt_without_scratchpad_gets_it_appended() {
    let policy = AgentPolicy::builder(AgentType::ZeroShotReactDescription)
        .llm(Arc::new(FakeListLlm::default()))
        .tools(vec![search_tool()])
        .prompt(PromptTemplate::new("Tools: {{tools}}\nQ: {{input}}".to_string()))
        .build()
        .unwrap();
    assert_eq!(
        policy.prompt().template(),
        "Tools: {{tools}}\nQ: {{input}}\n{{agent_scratchpad}}"
    );
}

#[test]
fn custom_prompt_without_input_is_rejected() {
    let err = AgentPolicy::builder(AgentType::ZeroShotReactDescription)
        .llm(Arc::new(FakeListLlm::default()))
        .tools(vec![search_tool()])
        .prompt(PromptTemplate::new("{{agent_scratchpad}}".to_string()))
        .build()
        .unwrap_err();
    assert!(matches!(err, AgentError::InvalidPrompt(_)));
}

#[test]
fn custom_stop_tokens_replace_the_defaults() {
    let policy = AgentPolicy::builder(AgentType::ZeroShotReactDescription)
        .llm(Arc::new(FakeListLlm::default()))
        .stop(vec!["STOP".to_string()])
        .build()
        .unwrap();
    assert_eq!(policy.stop(), ["STOP".to_string()]);
    assert!(policy.dispatcher().is_empty());
}
