use std::sync::Arc;

use async_trait::async_trait;
use ferrochain_agent::{
    initialize_agent, AgentInput, AgentRegistry, AgentType, ExecutorConfig, FnTool,
};
use ferrochain_core::{
    CallbackHandler, CallbackManager, FakeListLlm, RunContext, Runnable, StreamEvent, Tool, Value,
};
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

// Replays a two-step ReAct transcript: look up the time, then answer.
fn scripted_llm() -> Arc<FakeListLlm> {
    Arc::new(FakeListLlm::new([
        "Thought: I need to know the current time.\nAction: time\nAction Input: UTC",
        "Thought: I should add the offset.\nAction: calculator\nAction Input: 12 + 2",
        "Thought: I now know the final answer\nFinal Answer: It is 14:00 in Berlin.",
    ]))
}

fn tools() -> Vec<Arc<dyn Tool>> {
    let time = FnTool::new(
        "time",
        "Returns the current time in the given timezone.",
        |zone: String| async move { Ok(format!("It is 12:00 in {zone}")) },
    );
    let calculator = FnTool::new(
        "calculator",
        "Useful for basic arithmetic. Input should be a math expression.",
        |expr: String| async move {
            let total = expr
                .split('+')
                .map(|term| term.trim().parse::<i64>())
                .sum::<Result<i64, _>>()
                .map_err(|err| ferrochain_core::ToolError::InvalidInput(err.to_string()))?;
            Ok(total.to_string())
        },
    );
    vec![time.into_arc(), calculator.into_arc()]
}

struct StdoutCallbackHandler;

#[async_trait]
impl CallbackHandler for StdoutCallbackHandler {
    async fn on_start(&self, ctx: &RunContext, _inputs: &Value) {
        println!("[callback] start {:?} {}", ctx.run_type, ctx.name);
    }

    async fn on_end(&self, ctx: &RunContext, _outputs: &Value, duration_ms: u128) {
        println!(
            "[callback] end   {:?} {} in {}ms",
            ctx.run_type, ctx.name, duration_ms
        );
    }

    async fn on_error(&self, ctx: &RunContext, error: &Value, _duration_ms: u128) {
        println!("[callback] error {:?} {}: {}", ctx.run_type, ctx.name, error);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let registry = AgentRegistry::with_defaults();
    let config = ExecutorConfig {
        max_iterations: Some(5),
        return_intermediate_steps: true,
        ..ExecutorConfig::default()
    };

    println!("=== invoke ===");
    let executor = initialize_agent(
        &registry,
        AgentType::ZeroShotReactDescription,
        scripted_llm(),
        tools(),
        config.clone(),
    )?;
    let output = executor.invoke("What time is it in Berlin?").await?;
    for step in output.intermediate_steps.iter().flatten() {
        println!("{} -> {}", step.action.tool, step.observation);
    }
    tracing::info!(iterations = output.iterations, status = ?output.status, "run finished");
    println!("answer: {}", output.output());

    println!("\n=== stream with callbacks ===");
    let mut callbacks = CallbackManager::default();
    callbacks.add_handler(Arc::new(StdoutCallbackHandler));
    let policy = ferrochain_agent::AgentPolicy::builder(AgentType::ZeroShotReactDescription)
        .llm(scripted_llm())
        .tools(tools())
        .build()?;
    let executor = ferrochain_agent::AgentExecutor::builder()
        .policy(policy)
        .config(config)
        .callbacks(callbacks)
        .name("berlin-clock")
        .build()?;

    let mut events = executor.stream(AgentInput::new("What time is it in Berlin?"));
    while let Some(event) = events.next().await {
        match event? {
            StreamEvent::AgentAction { tool, tool_input, .. } => {
                println!("action: {tool}({tool_input})")
            }
            StreamEvent::Observation { observation, .. } => println!("observation: {observation}"),
            StreamEvent::Metadata { key, value } => println!("{key}: {value}"),
            StreamEvent::FinalAnswer(answer) => println!("final: {answer}"),
        }
    }

    Ok(())
}
