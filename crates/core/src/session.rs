//! Session state, budgets, and status.
//!
//! `SessionState` is owned exclusively by one loop controller for the
//! session's lifetime and mutated only inside its iteration step. Token and
//! cost accumulators are monotonic; status is terminal once it leaves
//! `Running`.

use crate::provider::Usage;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where a session ended up. Set exactly once, at return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// The loop is still iterating.
    Running,
    /// The loop produced a final output (or hit the iteration limit).
    Completed,
    /// The monetary cap was reached.
    CostLimit,
    /// The wall-clock budget expired mid-suspension.
    Timeout,
    /// An unrecoverable error escaped the iteration body.
    Failed,
}

/// Mutable per-session accumulators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Completed request/response cycles. Starts at 0.
    pub iteration: u32,

    /// Monotonic token accumulators.
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,

    /// Monotonic cost accumulator, derived from token deltas × pricing.
    pub estimated_cost_usd: f64,

    /// Current status.
    pub status: SessionStatus,
}

impl SessionState {
    /// A fresh session at iteration 0.
    pub fn new() -> Self {
        Self {
            iteration: 0,
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            estimated_cost_usd: 0.0,
            status: SessionStatus::Running,
        }
    }

    /// Restore from a caller-supplied snapshot (resume). Status is forced
    /// back to `Running`; the accumulators are taken as-is.
    pub fn resumed(snapshot: SessionState) -> Self {
        Self {
            status: SessionStatus::Running,
            ..snapshot
        }
    }

    /// Fold one model call's reported usage and computed cost into the
    /// accumulators.
    pub fn record_usage(&mut self, usage: Usage, cost_usd: f64) {
        self.prompt_tokens += u64::from(usage.prompt_tokens);
        self.completion_tokens += u64::from(usage.completion_tokens);
        self.total_tokens += u64::from(usage.total_tokens);
        self.estimated_cost_usd += cost_usd;
    }

    /// Whether the status has left `Running`.
    pub fn is_terminal(&self) -> bool {
        self.status != SessionStatus::Running
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable per-session budgets.
///
/// On resume, `cost_cap_usd` is whatever the caller supplies — the loop
/// does **not** add prior accumulation to the cap. A cap at or below the
/// resumed `estimated_cost_usd` yields zero iterations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBudgets {
    /// Maximum request/response cycles.
    pub max_iterations: u32,

    /// Wall-clock budget for the whole session.
    #[serde(with = "duration_millis")]
    pub timeout: Duration,

    /// Monetary cap in USD.
    pub cost_cap_usd: f64,
}

impl Default for SessionBudgets {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            timeout: Duration::from_secs(600),
            cost_cap_usd: 5.0,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Marks a history entry as a tool-result batch and records when it was
/// produced. Used for age-based decay of stale tool output.
///
/// Indices are invalidated whenever compaction rewrites the history; the
/// marker list must be cleared in the same operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutputMarker {
    pub message_index: usize,
    pub iteration: u32,
}
