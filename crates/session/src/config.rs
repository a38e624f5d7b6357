//! Per-session loop configuration.

use crate::narration::NarrationPolicy;

/// Knobs for one session's control loop, beyond the hard budgets.
pub struct SessionConfig {
    /// Model identifier passed to the provider.
    pub model: String,

    /// Tool whose invocation ends the session; its `summary` argument
    /// becomes the final output.
    pub finish_tool: String,

    /// Maximum corrective nudges injected per session.
    pub max_nudges: u32,

    /// Tool-result turns older than this many iterations get truncated.
    pub decay_after_iterations: u32,

    /// Characters kept when a stale tool-result turn is truncated.
    pub decay_truncate_chars: usize,

    /// Reported prompt tokens above which compaction is requested.
    pub compaction_threshold_tokens: u64,

    /// Sampling temperature forwarded to the provider.
    pub temperature: f32,

    /// Completion token cap forwarded to the provider, if any.
    pub max_tokens: Option<u32>,

    /// Narration/stall heuristics for the no-tool-call path.
    pub narration: NarrationPolicy,
}

impl SessionConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            finish_tool: "finish".into(),
            max_nudges: 2,
            decay_after_iterations: 3,
            decay_truncate_chars: 500,
            compaction_threshold_tokens: 100_000,
            temperature: 0.7,
            max_tokens: None,
            narration: NarrationPolicy::default(),
        }
    }
}
