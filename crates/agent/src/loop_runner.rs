//! The agent reasoning loop implementation.
//!
//! One question becomes a bounded sequence of model calls. Between calls the
//! loop dispatches the requested tools one at a time and narrates every step
//! as an [`AgentEvent`]. A run always ends with exactly one terminal event
//! unless its consumer goes away first.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use flightdeck_core::error::RunError;
use flightdeck_core::event::AgentEvent;
use flightdeck_core::message::{Conversation, MessageToolCall};
use flightdeck_core::provider::{ChatModel, ChatRequest};
use flightdeck_core::tool::{ToolArgs, ToolProvider, ToolSpec};
use futures::Stream;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, info_span, warn};

use crate::annotate::{self, ANNOTATE_ACK, Annotation};
use crate::instructions::DEFAULT_INSTRUCTIONS;
use crate::sink::EventSink;

pub const DEFAULT_MAX_ITERATIONS: u32 = 20;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Final-answer text when the model replies with nothing.
pub const EMPTY_ANSWER_FALLBACK: &str = "No response generated";

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    AwaitingModel,
    DispatchingTools,
    Terminated,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingModel => "awaiting_model",
            Self::DispatchingTools => "dispatching_tools",
            Self::Terminated => "terminated",
        }
    }
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed { final_answer: String },
    Failed(RunError),
}

/// What a finished run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Model calls made
    pub iterations: u32,
    /// Provider tool calls attempted (annotations excluded)
    pub tool_calls: usize,
    pub outcome: RunOutcome,
}

impl RunSummary {
    pub fn final_answer(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Completed { final_answer } => Some(final_answer),
            RunOutcome::Failed(_) => None,
        }
    }
}

/// Per-run mutable state. Owned by exactly one `drive` call.
struct RunContext {
    conversation: Conversation,
    iterations: u32,
    tool_calls: usize,
    phase: RunPhase,
    span: Span,
}

impl RunContext {
    fn enter(&mut self, phase: RunPhase) {
        self.phase = phase;
        self.span.record("phase", phase.as_str());
    }
}

/// The core agent loop that orchestrates model calls and tool execution.
///
/// Cheap to clone; every run gets its own conversation and event sink.
#[derive(Clone)]
pub struct AgentLoop {
    /// The chat model to use
    model: Arc<dyn ChatModel>,

    /// Where non-reflex tool calls go
    tools: Arc<dyn ToolProvider>,

    /// Model name sent with each request
    model_name: String,

    /// System instructions, set once per run
    instructions: String,

    temperature: Option<f32>,
    max_tokens: Option<u32>,

    /// Model calls allowed per run
    max_iterations: u32,

    /// Wall-clock limit per run, if any
    run_timeout: Option<Duration>,

    channel_capacity: usize,
}

impl AgentLoop {
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: Arc<dyn ToolProvider>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            model,
            tools,
            model_name: model_name.into(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            temperature: None,
            max_tokens: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            run_timeout: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Set the maximum number of model calls per run.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Abort runs that take longer than `timeout`.
    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    /// Events buffered between the loop and a slow consumer.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// The full catalog the model sees: `annotate` first, then the provider's
    /// tools. A listing failure leaves only `annotate`.
    pub async fn catalog(&self) -> Vec<ToolSpec> {
        let mut catalog = vec![annotate::annotate_spec()];
        match self.tools.list_tools().await {
            Ok(specs) => {
                for spec in specs {
                    if annotate::is_annotate(&spec.name) {
                        warn!(tool = %spec.name, "Provider tool shadows the annotate reflex, ignoring it");
                        continue;
                    }
                    catalog.push(spec);
                }
            }
            Err(e) => {
                warn!(provider = self.tools.name(), error = %e, "Tool listing failed, continuing with annotate only");
            }
        }
        catalog
    }

    /// Start a run on the tokio runtime.
    ///
    /// Dropping the returned handle detaches the consumer and aborts the run.
    pub fn run(&self, question: impl Into<String>) -> AgentRun {
        self.run_with_cancel(question, CancellationToken::new())
    }

    /// Start a run that also stops when `cancel` fires.
    pub fn run_with_cancel(&self, question: impl Into<String>, cancel: CancellationToken) -> AgentRun {
        let (sink, rx) = EventSink::channel(self.channel_capacity);
        let cancel = cancel.child_token();
        let agent = self.clone();
        let question = question.into();
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move { agent.execute(question, sink, task_cancel).await });

        AgentRun {
            events: ReceiverStream::new(rx),
            cancel,
            handle: Some(handle),
        }
    }

    /// `drive` raced against cancellation and the optional time limit.
    async fn execute(
        self,
        question: String,
        mut sink: EventSink,
        cancel: CancellationToken,
    ) -> Option<RunSummary> {
        let deadline = async {
            match self.run_timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Run cancelled, abandoning in-flight work");
                None
            }
            _ = deadline => {
                let timeout_ms = self.run_timeout.map(|d| d.as_millis() as u64).unwrap_or_default();
                warn!(timeout_ms, "Run timed out");
                let err = RunError::TimedOut { timeout_ms };
                if !sink.is_terminated() && !sink.is_detached() {
                    let event = AgentEvent::fatal_error("Run timed out", err.to_string(), err.to_string());
                    if let Err(e) = sink.emit(event).await {
                        debug!(error = %e, "Timeout event not delivered");
                    }
                }
                None
            }
            summary = self.drive(&question, &mut sink) => Some(summary),
        }
    }

    /// Run the loop to completion against a caller-owned sink.
    pub async fn drive(&self, question: &str, sink: &mut EventSink) -> RunSummary {
        let conversation = Conversation::start(&self.instructions, question);
        let span = info_span!(
            "agent_run",
            conversation_id = %conversation.id,
            phase = RunPhase::AwaitingModel.as_str(),
        );
        let mut ctx = RunContext {
            conversation,
            iterations: 0,
            tool_calls: 0,
            phase: RunPhase::AwaitingModel,
            span: span.clone(),
        };

        info!(parent: &span, model = %self.model_name, max_iterations = self.max_iterations, "Run started");

        let result = self.step_until_done(question, &mut ctx, sink).instrument(span.clone()).await;

        let outcome = match result {
            Ok(final_answer) => RunOutcome::Completed { final_answer },
            Err(err) => {
                if let Some(event) = terminal_event(&err)
                    && let Err(e) = sink.emit(event).await
                {
                    debug!(parent: &span, error = %e, "Terminal event not delivered");
                }
                RunOutcome::Failed(err)
            }
        };
        ctx.enter(RunPhase::Terminated);

        let summary = RunSummary {
            iterations: ctx.iterations,
            tool_calls: ctx.tool_calls,
            outcome,
        };
        match &summary.outcome {
            RunOutcome::Completed { .. } => info!(
                parent: &span,
                iterations = summary.iterations,
                tool_calls = summary.tool_calls,
                "Run completed"
            ),
            RunOutcome::Failed(err) => warn!(
                parent: &span,
                iterations = summary.iterations,
                tool_calls = summary.tool_calls,
                error = %err,
                "Run failed"
            ),
        }
        summary
    }

    /// The state machine. Returns the final answer, or the error that
    /// ended the run.
    async fn step_until_done(
        &self,
        question: &str,
        ctx: &mut RunContext,
        sink: &mut EventSink,
    ) -> Result<String, RunError> {
        sink.emit(AgentEvent::annotation(
            "Agent Started",
            format!("Processing your request: \"{question}\""),
        ))
        .await?;

        // Fetched once; the catalog is stable for the whole run.
        let catalog = self.catalog().await;

        loop {
            if ctx.iterations >= self.max_iterations {
                return Err(RunError::IterationBudgetExceeded {
                    max_iterations: self.max_iterations,
                });
            }
            ctx.iterations += 1;
            debug!(iteration = ctx.iterations, "Calling model");

            let request = ChatRequest {
                model: self.model_name.clone(),
                messages: ctx.conversation.messages.clone(),
                tools: catalog.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            };
            let response = self.model.complete(request).await?;
            let reply = response.message;

            if reply.tool_calls.is_empty() {
                let answer = if reply.content.trim().is_empty() {
                    EMPTY_ANSWER_FALLBACK.to_string()
                } else {
                    reply.content.clone()
                };
                ctx.conversation.push(reply);
                sink.emit(AgentEvent::message(answer.clone())).await?;
                sink.emit(AgentEvent::done(answer.clone())).await?;
                return Ok(answer);
            }

            // Content alongside tool calls is not an answer.
            let calls = reply.tool_calls.clone();
            ctx.conversation.push(reply);
            ctx.enter(RunPhase::DispatchingTools);

            debug!(iteration = ctx.iterations, calls = calls.len(), "Dispatching tool calls");
            for call in &calls {
                self.dispatch(call, ctx, sink).await?;
            }
            debug_assert!(ctx.conversation.pending_tool_calls().is_empty());
            ctx.enter(RunPhase::AwaitingModel);
        }
    }

    /// Handle one tool-call request. Only emission failures propagate;
    /// argument and tool errors are fed back to the model.
    async fn dispatch(
        &self,
        call: &MessageToolCall,
        ctx: &mut RunContext,
        sink: &mut EventSink,
    ) -> Result<(), RunError> {
        if annotate::is_annotate(&call.name) {
            let annotation = annotate::parse_annotation(&call.arguments).unwrap_or_else(|e| {
                debug!(call_id = %call.id, error = %e, "Malformed annotation, using defaults");
                Annotation::default()
            });
            sink.emit(AgentEvent::annotation(annotation.title, annotation.description))
                .await?;
            ctx.conversation.record_tool_result(&call.id, ANNOTATE_ACK);
            return Ok(());
        }

        ctx.tool_calls += 1;

        let args = match parse_arguments(&call.name, &call.arguments) {
            Ok(args) => args,
            Err(err) => {
                warn!(tool = %call.name, error = %err, "Unusable tool arguments");
                sink.emit(AgentEvent::tool_call(&call.name, Value::String(call.arguments.clone())))
                    .await?;
                sink.emit(AgentEvent::tool_error(&call.name, err.to_string()))
                    .await?;
                ctx.conversation.record_tool_result(&call.id, error_turn(&err));
                return Ok(());
            }
        };

        sink.emit(AgentEvent::tool_call(&call.name, Value::Object(args.clone())))
            .await?;

        debug!(tool = %call.name, call_id = %call.id, "Invoking tool");
        match self.tools.call(&call.name, args).await {
            Ok(result) => {
                ctx.conversation.record_tool_result(&call.id, result.to_string());
                sink.emit(AgentEvent::tool_result(&call.name, result)).await?;
            }
            Err(e) => {
                let err = RunError::ToolInvocation(e);
                warn!(tool = %call.name, error = %err, "Tool invocation failed");
                ctx.conversation.record_tool_result(&call.id, error_turn(&err));
                sink.emit(AgentEvent::tool_error(&call.name, err.to_string()))
                    .await?;
            }
        }
        Ok(())
    }
}

/// Decode raw model arguments into a JSON object. Blank means no arguments.
pub fn parse_arguments(tool: &str, raw: &str) -> Result<ToolArgs, RunError> {
    if raw.trim().is_empty() {
        return Ok(ToolArgs::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(args)) => Ok(args),
        Ok(other) => Err(RunError::ArgumentParse {
            tool: tool.to_string(),
            reason: format!("expected a JSON object, got {other}"),
        }),
        Err(e) => Err(RunError::ArgumentParse {
            tool: tool.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn error_turn(err: &RunError) -> String {
    json!({ "error": err.to_string() }).to_string()
}

/// The event announcing a fatal error. `None` when nobody is listening.
fn terminal_event(err: &RunError) -> Option<AgentEvent> {
    match err {
        RunError::IterationBudgetExceeded { .. } => Some(AgentEvent::fatal_error(
            "Max iterations reached",
            "The agent reached its maximum number of iterations",
            "Max iterations exceeded",
        )),
        RunError::UpstreamModel(e) => Some(AgentEvent::fatal_error(
            "Agent Error",
            e.to_string(),
            e.to_string(),
        )),
        RunError::TimedOut { .. } => Some(AgentEvent::fatal_error(
            "Run timed out",
            err.to_string(),
            err.to_string(),
        )),
        RunError::Detached | RunError::ArgumentParse { .. } | RunError::ToolInvocation(_) => None,
    }
}

/// Consumer handle for a spawned run.
///
/// Yields events in emission order and ends after the terminal event.
/// Dropping it aborts the run.
pub struct AgentRun {
    events: ReceiverStream<AgentEvent>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<Option<RunSummary>>>,
}

impl AgentRun {
    pub async fn next_event(&mut self) -> Option<AgentEvent> {
        self.events.next().await
    }

    /// Stop the run. Events already buffered can still be read.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drain every event, then wait for the loop to finish.
    ///
    /// The summary is `None` if the run was cancelled or timed out.
    pub async fn finish(mut self) -> (Vec<AgentEvent>, Option<RunSummary>) {
        let mut events = Vec::new();
        while let Some(event) = self.events.next().await {
            events.push(event);
        }
        let summary = match self.handle.take() {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                warn!(error = %e, "Run task failed");
                None
            }),
            None => None,
        };
        (events, summary)
    }
}

impl Stream for AgentRun {
    type Item = AgentEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().events).poll_next(cx)
    }
}

impl Drop for AgentRun {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
