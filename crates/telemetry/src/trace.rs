//! Phase-tagged trace events.
//!
//! Every interesting moment in a session (model call, tool decision, nudge,
//! compaction, termination) is recorded as one `TraceEvent` and forwarded to
//! an injected `TraceSink`. The session loop never constructs its own
//! transport — callers decide where events go.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The lifecycle phase a trace event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TracePhase {
    /// Session created (fresh or resumed).
    SessionStart,
    /// One model reasoning step completed.
    Reason,
    /// A tool call was decided on (allowed, denied, rejected, rate-limited).
    ToolCall,
    /// A tool call returned.
    ToolResult,
    /// The failure tracker injected a corrective message.
    ToolFailureRecovery,
    /// A narration/hallucination nudge was injected.
    NarrationNudge,
    /// Reflection pre-check fired.
    ReflectionPre,
    /// Reflection post-check fired.
    ReflectionPost,
    /// End-of-session reflection summary.
    ReflectionSession,
    /// History was compacted.
    Compaction,
    /// The session terminated normally.
    Finish,
    /// The session terminated with an error.
    Error,
}

/// One entry in the session trace stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub phase: TracePhase,

    /// Iteration the event was produced in (0 before the first iteration).
    pub iteration: u32,

    /// Human-readable detail (decision, nudge reason, error message, ...).
    pub detail: String,

    /// Tokens consumed by the step this event describes, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_delta: Option<u64>,

    /// Cost of the step this event describes, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_delta_usd: Option<f64>,

    pub timestamp: DateTime<Utc>,
}

impl TraceEvent {
    /// Create an event with no token/cost deltas.
    pub fn new(phase: TracePhase, iteration: u32, detail: impl Into<String>) -> Self {
        Self {
            phase,
            iteration,
            detail: detail.into(),
            tokens_delta: None,
            cost_delta_usd: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach token/cost deltas.
    pub fn with_deltas(mut self, tokens: u64, cost_usd: f64) -> Self {
        self.tokens_delta = Some(tokens);
        self.cost_delta_usd = Some(cost_usd);
        self
    }
}

/// Where trace events are written.
pub trait TraceSink: Send + Sync {
    fn record(&self, event: &TraceEvent);
}

/// A sink that logs events via `tracing::info!`.
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn record(&self, event: &TraceEvent) {
        tracing::info!(
            phase = ?event.phase,
            iteration = event.iteration,
            tokens = ?event.tokens_delta,
            cost = ?event.cost_delta_usd,
            "{}",
            event.detail
        );
    }
}

/// An in-memory sink that stores events in a vector.
/// Useful for tests and replay tooling.
#[derive(Default)]
pub struct MemorySink {
    events: std::sync::Mutex<Vec<TraceEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, in emission order.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Events matching a phase.
    pub fn events_for(&self, phase: TracePhase) -> Vec<TraceEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.phase == phase)
            .cloned()
            .collect()
    }

    /// Number of recorded events.
    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl TraceSink for MemorySink {
    fn record(&self, event: &TraceEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
