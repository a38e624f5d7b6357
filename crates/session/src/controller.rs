//! The session loop controller.
//!
//! Owns all per-session state and drives the model/tool dialogue until a
//! budget runs out or a final answer is produced. The caller always gets a
//! well-formed [`SessionOutcome`] back — errors escaping the iteration body
//! are caught exactly once and downgraded to a terminal status.

use crate::config::SessionConfig;
use crate::failure::ToolFailureTracker;
use crate::summarize::Summarizer;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{Instant, timeout};
use tracing::{debug, info, warn};
use warden_core::error::{Error, SessionError};
use warden_core::message::Message;
use warden_core::provider::{ModelProvider, ModelRequest, StreamEvent, Usage};
use warden_core::session::{SessionBudgets, SessionState, SessionStatus, ToolOutputMarker};
use warden_core::tool::{ToolCall, ToolOutcome, ToolRegistry};
use warden_governance::GovernedExecutor;
use warden_reflection::{
    BehavioralContext, CompletionContext, ReflectionPolicy, ReflectionSummary,
};
use warden_telemetry::pricing::PricingTable;
use warden_telemetry::trace::{TraceEvent, TracePhase, TraceSink};

/// Everything a session hands back to its caller. Persistence of the
/// history and markers is the caller's concern; `resume` accepts them
/// again.
#[derive(Debug)]
pub struct SessionOutcome {
    pub output: String,
    pub state: SessionState,
    pub history: Vec<Message>,
    pub tool_output_markers: Vec<ToolOutputMarker>,
    pub summary: ReflectionSummary,
}

/// Drives one session to completion.
pub struct SessionController {
    session_id: String,
    provider: Arc<dyn ModelProvider>,
    executor: Arc<GovernedExecutor>,
    tools: Arc<ToolRegistry>,
    pricing: Arc<PricingTable>,
    sink: Arc<dyn TraceSink>,
    summarizer: Option<Arc<dyn Summarizer>>,
    reflection: ReflectionPolicy,
    config: SessionConfig,
    budgets: SessionBudgets,
}

impl SessionController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: impl Into<String>,
        provider: Arc<dyn ModelProvider>,
        executor: Arc<GovernedExecutor>,
        tools: Arc<ToolRegistry>,
        pricing: Arc<PricingTable>,
        sink: Arc<dyn TraceSink>,
        config: SessionConfig,
        budgets: SessionBudgets,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            provider,
            executor,
            tools,
            pricing,
            sink,
            summarizer: None,
            reflection: ReflectionPolicy::default(),
            config,
            budgets,
        }
    }

    /// Attach a compaction collaborator.
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Replace the reflection policy.
    pub fn with_reflection_policy(mut self, reflection: ReflectionPolicy) -> Self {
        self.reflection = reflection;
        self
    }

    /// Run a fresh session from one user input.
    pub async fn run(&self, input: impl Into<String>) -> SessionOutcome {
        let history = vec![Message::user(input)];
        self.drive(history, SessionState::new(), "session started")
            .await
    }

    /// Resume from a persisted history and state snapshot.
    ///
    /// The cost cap in effect is whatever the budgets carry — prior
    /// accumulation is **not** added to it here. A cap at or below the
    /// snapshot's `estimated_cost_usd` yields zero iterations and
    /// `CostLimit`.
    pub async fn resume(&self, history: Vec<Message>, snapshot: SessionState) -> SessionOutcome {
        self.drive(history, SessionState::resumed(snapshot), "session resumed")
            .await
    }

    async fn drive(
        &self,
        mut history: Vec<Message>,
        mut state: SessionState,
        start_detail: &str,
    ) -> SessionOutcome {
        let deadline = Instant::now() + self.budgets.timeout;
        let mut markers: Vec<ToolOutputMarker> = Vec::new();
        let mut summary = ReflectionSummary::default();

        self.sink.record(&TraceEvent::new(
            TracePhase::SessionStart,
            state.iteration,
            format!("{start_detail} (session {})", self.session_id),
        ));

        let result = self
            .iterate(deadline, &mut state, &mut history, &mut markers, &mut summary)
            .await;

        let output = match result {
            Ok(Some(text)) => {
                state.status = SessionStatus::Completed;
                text
            }
            Ok(None) => {
                // The loop guard stopped us: iteration limit first, then cost.
                if state.iteration >= self.budgets.max_iterations {
                    state.status = SessionStatus::Completed;
                    "Reached the iteration limit without a final answer.".to_string()
                } else {
                    state.status = SessionStatus::CostLimit;
                    format!("Cost cap of ${:.2} reached.", self.budgets.cost_cap_usd)
                }
            }
            Err(err) => {
                let timed_out =
                    matches!(err, Error::Session(SessionError::DeadlineExceeded { .. }));
                state.status = if timed_out {
                    SessionStatus::Timeout
                } else {
                    SessionStatus::Failed
                };
                warn!(session_id = %self.session_id, %err, "Session terminated abnormally");
                self.sink.record(&TraceEvent::new(
                    TracePhase::Error,
                    state.iteration,
                    err.to_string(),
                ));
                err.to_string()
            }
        };

        self.sink.record(&TraceEvent::new(
            TracePhase::ReflectionSession,
            state.iteration,
            summary.report(),
        ));
        self.sink.record(
            &TraceEvent::new(
                TracePhase::Finish,
                state.iteration,
                format!("status={:?}", state.status),
            )
            .with_deltas(state.total_tokens, state.estimated_cost_usd),
        );
        info!(
            session_id = %self.session_id,
            iterations = state.iteration,
            status = ?state.status,
            cost_usd = state.estimated_cost_usd,
            "Session finished"
        );

        SessionOutcome {
            output,
            state,
            history,
            tool_output_markers: markers,
            summary,
        }
    }

    /// The iteration body. Returns the final output when the loop exited
    /// via an accepted answer or the finish tool; `None` when a budget
    /// guard stopped it. Any error propagates to `drive`, which catches it
    /// exactly once.
    async fn iterate(
        &self,
        deadline: Instant,
        state: &mut SessionState,
        history: &mut Vec<Message>,
        markers: &mut Vec<ToolOutputMarker>,
        summary: &mut ReflectionSummary,
    ) -> Result<Option<String>, Error> {
        let mut tracker = ToolFailureTracker::new();
        let mut behavior = BehavioralContext::default();
        let mut completion = CompletionContext::default();
        let mut nudges: u32 = 0;

        while state.iteration < self.budgets.max_iterations
            && state.estimated_cost_usd < self.budgets.cost_cap_usd
        {
            state.iteration += 1;

            let request = ModelRequest {
                model: self.config.model.clone(),
                messages: history.clone(),
                tools: self.tools.definitions(),
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
            };
            let mut receiver = self.timed(deadline, self.provider.stream(request)).await??;

            let mut text = String::new();
            let mut reasoning = String::new();
            let mut calls: Vec<ToolCall> = Vec::new();
            let mut usage: Option<Usage> = None;
            loop {
                let Some(event) = self.timed(deadline, receiver.recv()).await? else {
                    break;
                };
                match event? {
                    StreamEvent::TextDelta { content } => text.push_str(&content),
                    StreamEvent::ReasoningDelta { content } => reasoning.push_str(&content),
                    StreamEvent::ToolCallRequest { call } => calls.push(call),
                    StreamEvent::Done { usage: reported, .. } => {
                        usage = reported;
                        break;
                    }
                }
            }

            let usage = usage.unwrap_or_default();
            let cost = self.pricing.compute_cost(
                &self.config.model,
                usage.prompt_tokens,
                usage.completion_tokens,
            );
            state.record_usage(usage, cost);
            self.sink.record(
                &TraceEvent::new(
                    TracePhase::Reason,
                    state.iteration,
                    format!("model step: {} tool calls", calls.len()),
                )
                .with_deltas(u64::from(usage.total_tokens), cost),
            );

            history.push(
                Message::assistant(text.clone())
                    .with_reasoning(reasoning)
                    .with_tool_calls(calls.clone()),
            );

            if calls.is_empty() {
                if let Some(finding) = self.config.narration.detect(&text, behavior.total_calls)
                    && nudges < self.config.max_nudges
                {
                    nudges += 1;
                    self.inject_nudge(
                        history,
                        summary,
                        TracePhase::NarrationNudge,
                        state.iteration,
                        format!("{finding:?}"),
                        finding.guidance().to_string(),
                    );
                    continue;
                }

                if let Some(verdict) = self.reflection.completion_gate(&text, &completion)
                    && nudges < self.config.max_nudges
                {
                    nudges += 1;
                    self.inject_nudge(
                        history,
                        summary,
                        TracePhase::ReflectionPost,
                        state.iteration,
                        verdict.reason,
                        verdict.guidance,
                    );
                    continue;
                }

                return Ok(Some(text));
            }

            // Finish short-circuits the rest of the batch.
            if let Some(finish) = calls.iter().find(|c| c.name == self.config.finish_tool) {
                let output = finish
                    .arguments
                    .get("summary")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or(text);
                return Ok(Some(output));
            }

            // Sequential execution: ordering is load-bearing for nudge
            // budgets and audit traces.
            let mut sections = Vec::with_capacity(calls.len());
            let mut batch: Vec<(String, bool)> = Vec::with_capacity(calls.len());
            for call in &calls {
                behavior.record_call(&self.reflection, &call.name);

                let pre =
                    self.reflection
                        .pre_check(&call.name, &call.arguments, self.tools.get(&call.name));
                summary.record_pre(&pre);
                if pre.block || pre.recommendation.is_some() {
                    self.sink.record(&TraceEvent::new(
                        TracePhase::ReflectionPre,
                        state.iteration,
                        format!(
                            "{}: risk={:?} block={}",
                            call.name, pre.risk, pre.block
                        ),
                    ));
                }

                let outcome = if pre.block {
                    let reason = pre
                        .recommendation
                        .unwrap_or_else(|| "call blocked".to_string());
                    ToolOutcome::error(format!("Error: call blocked — {reason}"), 0)
                } else {
                    self.timed(
                        deadline,
                        self.executor.execute(&self.session_id, state.iteration, call),
                    )
                    .await?
                };
                self.sink.record(&TraceEvent::new(
                    TracePhase::ToolResult,
                    state.iteration,
                    format!(
                        "{}: {} ({}ms)",
                        call.name,
                        if outcome.is_error { "error" } else { "ok" },
                        outcome.duration_ms
                    ),
                ));

                if outcome.is_error
                    && let Some(path) = self.reflection.path_argument(&call.arguments)
                {
                    behavior.record_path_failure(path);
                }

                let post = self.reflection.post_check(
                    &call.name,
                    &call.arguments,
                    &outcome,
                    &behavior.failed_paths,
                );
                summary.record_post(&post);
                if post.should_nudge {
                    self.sink.record(&TraceEvent::new(
                        TracePhase::ReflectionPost,
                        state.iteration,
                        format!("{}: {}", call.name, outcome.output),
                    ));
                }

                completion.record(self.reflection.category_of(&call.name), outcome.is_error);
                batch.push((call.name.clone(), outcome.is_error));

                let mut section = format!("[{}] {}", call.name, outcome.output);
                if let Some(guidance) = post.guidance {
                    section.push_str("\nGuidance: ");
                    section.push_str(&guidance);
                }
                sections.push(section);
            }

            // One combined tool-result turn per iteration.
            markers.push(ToolOutputMarker {
                message_index: history.len(),
                iteration: state.iteration,
            });
            history.push(Message::tool_result(sections.join("\n\n")));

            if let Some(action) = tracker.process(&batch) {
                let message = action.message();
                self.sink.record(&TraceEvent::new(
                    TracePhase::ToolFailureRecovery,
                    state.iteration,
                    message.clone(),
                ));
                history.push(Message::user(message));
            }

            if let Some(pattern) = self.reflection.behavioral_patterns(&behavior)
                && nudges < self.config.max_nudges
            {
                nudges += 1;
                self.inject_nudge(
                    history,
                    summary,
                    TracePhase::NarrationNudge,
                    state.iteration,
                    format!("{pattern:?}"),
                    pattern.guidance(),
                );
            }

            self.decay_stale_tool_output(history, markers, state.iteration);

            if u64::from(usage.prompt_tokens) > self.config.compaction_threshold_tokens
                && let Some(summarizer) = &self.summarizer
            {
                let compacted = self
                    .timed(deadline, summarizer.summarize(&self.config.model, history))
                    .await??;
                self.sink.record(&TraceEvent::new(
                    TracePhase::Compaction,
                    state.iteration,
                    format!(
                        "history compacted: {} -> {} messages",
                        history.len(),
                        compacted.messages.len()
                    ),
                ));
                *history = compacted.messages;
                // Indices into the old history are now meaningless.
                markers.clear();
            }
        }

        Ok(None)
    }

    /// Race a suspension point against the session deadline.
    async fn timed<T, F>(&self, deadline: Instant, fut: F) -> Result<T, Error>
    where
        F: Future<Output = T>,
    {
        let remaining = deadline.saturating_duration_since(Instant::now());
        timeout(remaining, fut).await.map_err(|_| {
            Error::Session(SessionError::DeadlineExceeded {
                elapsed_ms: self.budgets.timeout.as_millis() as u64,
            })
        })
    }

    fn inject_nudge(
        &self,
        history: &mut Vec<Message>,
        summary: &mut ReflectionSummary,
        phase: TracePhase,
        iteration: u32,
        detail: String,
        guidance: String,
    ) {
        debug!(iteration, detail, "Injecting corrective nudge");
        let nudge = Message::user(guidance);
        let tokens = nudge.estimated_tokens() as u64;
        let cost = self
            .pricing
            .compute_cost(&self.config.model, tokens as u32, 0);
        summary.record_nudge(tokens, cost);
        self.sink
            .record(&TraceEvent::new(phase, iteration, detail).with_deltas(tokens, cost));
        history.push(nudge);
    }

    /// Truncate tool-result turns older than the configured iteration age.
    /// Cheap and unconditional — runs every iteration, independent of
    /// compaction.
    fn decay_stale_tool_output(
        &self,
        history: &mut [Message],
        markers: &[ToolOutputMarker],
        iteration: u32,
    ) {
        for marker in markers {
            if iteration.saturating_sub(marker.iteration) < self.config.decay_after_iterations {
                continue;
            }
            let Some(message) = history.get_mut(marker.message_index) else {
                continue;
            };
            let limit = self.config.decay_truncate_chars;
            if message.content.chars().count() > limit && !message.content.ends_with("truncated]") {
                let kept: String = message.content.chars().take(limit).collect();
                let dropped = message.content.chars().count() - limit;
                message.content = format!("{kept}…[{dropped} chars of stale tool output truncated]");
            }
        }
    }
}
