use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ferrochain_agent::{
    AgentRegistry, AgentSettings, EarlyStoppingMethod, Scratchpad, StructuredTool, TypedTool,
};
use ferrochain_core::{FakeListLlm, ToolError};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize, JsonSchema)]
struct FlightQuery {
    origin: String,
    destination: String,
}

struct FlightSearch;

#[async_trait]
impl TypedTool for FlightSearch {
    type Args = FlightQuery;

    const NAME: &'static str = "flight_search";
    const DESCRIPTION: &'static str = "Finds the cheapest direct flight between two airports.";

    async fn run(&self, args: Self::Args) -> Result<String, ToolError> {
        Ok(format!(
            "{} -> {}: 89 EUR, departs 07:15",
            args.origin, args.destination
        ))
    }
}

const SETTINGS: &str = r#"{
    "agent": "structured-chat-zero-shot-react-description",
    "executor": {
        "max_iterations": 3,
        "max_execution_time_secs": 30,
        "early_stopping_method": "generate"
    }
}"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let settings = AgentSettings::from_json(SETTINGS)?;
    assert_eq!(
        settings.executor.early_stopping_method,
        EarlyStoppingMethod::Generate
    );
    assert_eq!(
        settings.executor.max_execution_time,
        Some(Duration::from_secs(30))
    );

    let llm = Arc::new(FakeListLlm::new([
        "Thought: search flights\nAction:\n```\n{\"action\": \"flight_search\", \"action_input\": {\"origin\": \"LIS\", \"destination\": \"OSL\"}}\n```",
        "Thought: I know what to respond\nAction:\n```\n{\"action\": \"Final Answer\", \"action_input\": \"The cheapest flight costs 89 EUR and leaves at 07:15.\"}\n```",
    ]));
    let tools = vec![StructuredTool::new(FlightSearch)?.into_arc()];

    let executor = settings.initialize(&AgentRegistry::with_defaults(), llm.clone(), tools)?;
    let question = "Cheapest flight from Lisbon to Oslo?";
    let prompt = executor
        .policy()
        .render_prompt(&Scratchpad::new(), question)?;
    println!("{prompt}");

    let answer = executor.run(question).await?;
    println!("\nanswer: {answer}");
    println!("model calls: {}", llm.call_count());

    Ok(())
}
