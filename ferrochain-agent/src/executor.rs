use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ferrochain_core::{
    ensure_object, CallbackManager, FerroError, RunContext, RunType, Runnable, StreamEvent, Value,
};
use futures::stream::{BoxStream, StreamExt};
use serde::Serialize;
use serde_json::json;
use tokio::time::Instant;
use tracing::Instrument;

use crate::action::{
    AgentAction, AgentFinish, AgentStep, IntermediateStep, Scratchpad, OUTPUT_KEY,
};
use crate::config::{EarlyStoppingMethod, ExecutorConfig, ExecutorOptions};
use crate::dispatcher::ResolvedTool;
use crate::error::AgentError;
use crate::policy::{AgentPolicy, RunTrace};
use crate::prompts::STOPPED_MESSAGE;

/// Tool name recorded for steps synthesized from unparseable model output.
pub const EXCEPTION_TOOL: &str = "_Exception";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Finished,
    StoppedMaxIterations,
    StoppedMaxTime,
    Error,
}

impl RunStatus {
    pub fn is_early_stop(&self) -> bool {
        matches!(
            self,
            RunStatus::StoppedMaxIterations | RunStatus::StoppedMaxTime
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentInput {
    pub input: String,
    /// Extra stop tokens, added to the agent's defaults.
    pub stop: Option<Vec<String>>,
    /// Steps to seed the scratchpad with. They do not count as iterations.
    pub intermediate_steps: Vec<IntermediateStep>,
    pub options: ExecutorOptions,
}

impl AgentInput {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn with_intermediate_steps(mut self, steps: Vec<IntermediateStep>) -> Self {
        self.intermediate_steps = steps;
        self
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }
}

impl From<String> for AgentInput {
    fn from(input: String) -> Self {
        Self::new(input)
    }
}

impl From<&str> for AgentInput {
    fn from(input: &str) -> Self {
        Self::new(input)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentOutput {
    pub return_values: BTreeMap<String, String>,
    /// Present only when intermediate-step reporting is enabled.
    pub intermediate_steps: Option<Vec<IntermediateStep>>,
    pub status: RunStatus,
    pub iterations: usize,
}

impl AgentOutput {
    pub fn output(&self) -> &str {
        self.return_values
            .get(OUTPUT_KEY)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NextStep {
    Step(IntermediateStep),
    Finished(AgentOutput),
}

/// Drives an [`AgentPolicy`] until it produces a final answer or a budget
/// runs out. One executor can serve concurrent runs; each run owns its own
/// scratchpad, counters and clock.
#[derive(Debug, Clone)]
pub struct AgentExecutor {
    policy: Arc<AgentPolicy>,
    config: ExecutorConfig,
    callbacks: CallbackManager,
    name: String,
}

impl AgentExecutor {
    pub fn new(policy: AgentPolicy, config: ExecutorConfig) -> Self {
        Self {
            name: policy.agent_type().to_string(),
            policy: Arc::new(policy),
            config,
            callbacks: CallbackManager::noop(),
        }
    }

    pub fn builder() -> AgentExecutorBuilder {
        AgentExecutorBuilder::default()
    }

    pub fn policy(&self) -> &AgentPolicy {
        &self.policy
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn iter(&self, input: impl Into<AgentInput>) -> AgentIterator<'_> {
        AgentIterator::new(self, input.into())
    }

    pub async fn invoke(&self, input: impl Into<AgentInput>) -> Result<AgentOutput, AgentError> {
        let mut run = self.iter(input);
        loop {
            if let NextStep::Finished(output) = run.next_step().await? {
                return Ok(output);
            }
        }
    }

    /// Runs one objective and returns only the final answer text.
    pub async fn run(&self, objective: impl Into<String>) -> Result<String, AgentError> {
        let mut output = self.invoke(AgentInput::new(objective)).await?;
        Ok(output.return_values.remove(OUTPUT_KEY).unwrap_or_default())
    }
}

#[async_trait]
impl Runnable<AgentInput, AgentOutput> for AgentExecutor {
    async fn invoke(&self, input: AgentInput) -> Result<AgentOutput, FerroError> {
        AgentExecutor::invoke(self, input)
            .await
            .map_err(FerroError::from)
    }

    fn stream(&self, input: AgentInput) -> BoxStream<'_, Result<StreamEvent, FerroError>> {
        async_stream::stream! {
            let mut run = self.iter(input);
            loop {
                match run.next_step().await {
                    Ok(NextStep::Step(step)) => {
                        let IntermediateStep { action, observation } = step;
                        yield Ok(StreamEvent::AgentAction {
                            tool: action.tool.clone(),
                            tool_input: action.tool_input,
                            log: action.log,
                        });
                        yield Ok(StreamEvent::Observation {
                            tool: action.tool,
                            observation,
                        });
                    }
                    Ok(NextStep::Finished(output)) => {
                        yield Ok(StreamEvent::Metadata {
                            key: "status".to_string(),
                            value: json!(output.status),
                        });
                        yield Ok(StreamEvent::FinalAnswer(output.output().to_string()));
                        break;
                    }
                    Err(err) => {
                        yield Err(FerroError::from(err));
                        break;
                    }
                }
            }
        }
        .boxed()
    }
}

#[derive(Default)]
pub struct AgentExecutorBuilder {
    policy: Option<Arc<AgentPolicy>>,
    config: ExecutorConfig,
    callbacks: CallbackManager,
    name: Option<String>,
}

impl AgentExecutorBuilder {
    pub fn policy(mut self, policy: AgentPolicy) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    pub fn shared_policy(mut self, policy: Arc<AgentPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_iterations(mut self, max_iterations: Option<usize>) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn max_execution_time(mut self, limit: Duration) -> Self {
        self.config.max_execution_time = Some(limit);
        self
    }

    pub fn early_stopping_method(mut self, method: EarlyStoppingMethod) -> Self {
        self.config.early_stopping_method = method;
        self
    }

    pub fn return_intermediate_steps(mut self, enabled: bool) -> Self {
        self.config.return_intermediate_steps = enabled;
        self
    }

    pub fn max_consecutive_parse_errors(mut self, limit: usize) -> Self {
        self.config.max_consecutive_parse_errors = Some(limit);
        self
    }

    pub fn callbacks(mut self, callbacks: CallbackManager) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn build(self) -> Result<AgentExecutor, AgentError> {
        let policy = self
            .policy
            .ok_or_else(|| AgentError::InvalidConfig("missing agent policy".to_string()))?;
        Ok(AgentExecutor {
            name: self
                .name
                .unwrap_or_else(|| policy.agent_type().to_string()),
            policy,
            config: self.config,
            callbacks: self.callbacks,
        })
    }
}

/// One run of an [`AgentExecutor`], advanced a step at a time.
pub struct AgentIterator<'a> {
    executor: &'a AgentExecutor,
    objective: String,
    stop: Option<Vec<String>>,
    config: ExecutorConfig,
    scratchpad: Scratchpad,
    iterations: usize,
    consecutive_parse_errors: usize,
    direct_answer: Option<String>,
    started: Instant,
    status: RunStatus,
    run: RunContext,
    run_started: bool,
    span: tracing::Span,
}

impl<'a> AgentIterator<'a> {
    fn new(executor: &'a AgentExecutor, input: AgentInput) -> Self {
        let run = RunContext::root(
            RunType::Agent,
            executor.name.clone(),
            vec![],
            BTreeMap::new(),
        );
        let span = tracing::info_span!(
            "agent_run",
            agent = %executor.policy.agent_type(),
            run_id = %run.run_id,
        );
        Self {
            executor,
            config: executor.config.merge(&input.options),
            objective: input.input,
            stop: input.stop,
            scratchpad: Scratchpad::from_steps(input.intermediate_steps),
            iterations: 0,
            consecutive_parse_errors: 0,
            direct_answer: None,
            started: Instant::now(),
            status: RunStatus::Running,
            run,
            run_started: false,
            span,
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn scratchpad(&self) -> &Scratchpad {
        &self.scratchpad
    }

    /// Advances the run by one planning step. Calling it again after the run
    /// has ended returns [`AgentError::RunFinished`].
    pub async fn next_step(&mut self) -> Result<NextStep, AgentError> {
        if self.status != RunStatus::Running {
            return Err(AgentError::RunFinished);
        }

        let executor = self.executor;
        let callbacks = &executor.callbacks;
        if !self.run_started {
            self.run_started = true;
            if !callbacks.is_noop() {
                callbacks
                    .on_start(&self.run, &json!({ "input": self.objective }))
                    .await;
            }
        }

        let span = self.span.clone();
        let result = self.advance().instrument(span).await;

        match &result {
            Ok(NextStep::Finished(output)) if !callbacks.is_noop() => {
                let outputs = json!({ "output": output.output(), "status": output.status });
                callbacks
                    .on_end(&self.run, &outputs, self.run.elapsed_ms())
                    .await;
            }
            Err(err) => {
                self.status = RunStatus::Error;
                if !callbacks.is_noop() {
                    let error = ensure_object(Value::String(err.to_string()));
                    callbacks
                        .on_error(&self.run, &error, self.run.elapsed_ms())
                        .await;
                }
            }
            _ => {}
        }
        result
    }

    async fn advance(&mut self) -> Result<NextStep, AgentError> {
        if let Some(answer) = self.direct_answer.take() {
            let finish = AgentFinish::new(answer, "");
            return Ok(NextStep::Finished(self.finish(finish, RunStatus::Finished)));
        }

        if let Some(status) = self.budget_exhausted() {
            return self.stop_early(status).await.map(NextStep::Finished);
        }

        let executor = self.executor;
        let trace = RunTrace {
            callbacks: &executor.callbacks,
            parent: &self.run,
        };
        let planned = executor
            .policy
            .plan_traced(
                &self.scratchpad,
                &self.objective,
                self.stop.as_deref(),
                false,
                Some(trace),
            )
            .await;

        match planned {
            Ok(AgentStep::Finish(finish)) => {
                tracing::debug!(iterations = self.iterations, "agent returned a final answer");
                Ok(NextStep::Finished(self.finish(finish, RunStatus::Finished)))
            }
            Ok(AgentStep::Action(action)) => {
                self.consecutive_parse_errors = 0;
                let tool = executor.policy.dispatcher().resolve(&action.tool);
                let observation = self.dispatch(&tool, &action).await?;
                if tool.return_direct() {
                    self.direct_answer = Some(observation.clone());
                }
                Ok(NextStep::Step(self.record(action, observation)))
            }
            Err(AgentError::OutputParsing(err)) => {
                self.consecutive_parse_errors += 1;
                if let Some(limit) = self.config.max_consecutive_parse_errors {
                    if self.consecutive_parse_errors > limit {
                        return Err(AgentError::OutputParsing(err));
                    }
                }
                tracing::warn!(
                    kind = ?err.kind,
                    consecutive = self.consecutive_parse_errors,
                    "could not parse model output; feeding the error back"
                );
                let observation = err.observation();
                let action = AgentAction::new(
                    EXCEPTION_TOOL,
                    Value::String(err.raw_text.clone()),
                    err.raw_text,
                );
                Ok(NextStep::Step(self.record(action, observation)))
            }
            Err(err) => Err(err),
        }
    }

    fn budget_exhausted(&self) -> Option<RunStatus> {
        if let Some(max) = self.config.max_iterations {
            if self.iterations >= max {
                return Some(RunStatus::StoppedMaxIterations);
            }
        }
        if let Some(limit) = self.config.max_execution_time {
            if self.started.elapsed() >= limit {
                return Some(RunStatus::StoppedMaxTime);
            }
        }
        None
    }

    async fn stop_early(&mut self, status: RunStatus) -> Result<AgentOutput, AgentError> {
        let method = self.config.early_stopping_method;
        tracing::warn!(
            iterations = self.iterations,
            ?status,
            ?method,
            "budget exhausted; stopping early"
        );

        let finish = match method {
            EarlyStoppingMethod::Force => AgentFinish::new(STOPPED_MESSAGE, ""),
            EarlyStoppingMethod::Generate => {
                let executor = self.executor;
                let trace = RunTrace {
                    callbacks: &executor.callbacks,
                    parent: &self.run,
                };
                let planned = executor
                    .policy
                    .plan_traced(
                        &self.scratchpad,
                        &self.objective,
                        self.stop.as_deref(),
                        true,
                        Some(trace),
                    )
                    .await;
                match planned {
                    Ok(AgentStep::Finish(finish)) => finish,
                    Ok(AgentStep::Action(action)) => {
                        AgentFinish::new(action.tool_input_text(), action.log)
                    }
                    Err(AgentError::OutputParsing(err)) => {
                        AgentFinish::new(err.raw_text.trim(), err.raw_text.clone())
                    }
                    Err(err) => return Err(err),
                }
            }
        };

        Ok(self.finish(finish, status))
    }

    async fn dispatch(
        &self,
        tool: &ResolvedTool,
        action: &AgentAction,
    ) -> Result<String, AgentError> {
        if tool.is_registered() {
            tracing::debug!(tool = %action.tool, "dispatching tool");
        } else {
            tracing::warn!(tool = %action.tool, "model requested an unknown tool");
        }

        let executor = self.executor;
        let callbacks = &executor.callbacks;
        let ctx = (!callbacks.is_noop())
            .then(|| self.run.child(RunType::Tool, tool.name().to_string()));
        if let Some(ctx) = &ctx {
            callbacks
                .on_start(ctx, &ensure_object(action.tool_input.clone()))
                .await;
        }

        let result = executor
            .policy
            .dispatcher()
            .invoke(tool, action.tool_input.clone())
            .await;

        match result {
            Ok(observation) => {
                if let Some(ctx) = &ctx {
                    let outputs = ensure_object(Value::String(observation.clone()));
                    callbacks.on_end(ctx, &outputs, ctx.elapsed_ms()).await;
                }
                Ok(observation)
            }
            Err(source) => {
                if let Some(ctx) = &ctx {
                    let error = ensure_object(Value::String(source.to_string()));
                    callbacks.on_error(ctx, &error, ctx.elapsed_ms()).await;
                }
                Err(AgentError::Tool {
                    name: tool.name().to_string(),
                    source,
                })
            }
        }
    }

    fn record(&mut self, action: AgentAction, observation: String) -> IntermediateStep {
        let step = IntermediateStep::new(action, observation);
        self.scratchpad.push(step.clone());
        self.iterations += 1;
        step
    }

    fn finish(&mut self, finish: AgentFinish, status: RunStatus) -> AgentOutput {
        self.status = status;
        AgentOutput {
            return_values: finish.return_values,
            intermediate_steps: self
                .config
                .return_intermediate_steps
                .then(|| self.scratchpad.steps().to_vec()),
            status,
            iterations: self.iterations,
        }
    }
}
