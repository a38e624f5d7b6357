//! Per-session reflection accounting, reported once at session end.

use crate::check::{PostCheckVerdict, PreCheckVerdict, Risk};
use serde::{Deserialize, Serialize};

/// Counters written only at the reflection call sites; read-only after the
/// session finishes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReflectionSummary {
    pub pre_checks: u32,
    pub blocked_calls: u32,
    pub high_risk_calls: u32,
    pub post_checks: u32,
    pub post_errors: u32,
    pub nudges_injected: u32,
    /// Estimated prompt-token overhead of injected nudges.
    pub nudge_tokens: u64,
    /// Estimated cost overhead of injected nudges.
    pub nudge_cost_usd: f64,
}

impl ReflectionSummary {
    pub fn record_pre(&mut self, verdict: &PreCheckVerdict) {
        self.pre_checks += 1;
        if verdict.block {
            self.blocked_calls += 1;
        }
        if verdict.risk == Risk::High {
            self.high_risk_calls += 1;
        }
    }

    pub fn record_post(&mut self, verdict: &PostCheckVerdict) {
        self.post_checks += 1;
        if !verdict.ok {
            self.post_errors += 1;
        }
    }

    pub fn record_nudge(&mut self, estimated_tokens: u64, estimated_cost_usd: f64) {
        self.nudges_injected += 1;
        self.nudge_tokens += estimated_tokens;
        self.nudge_cost_usd += estimated_cost_usd;
    }

    /// One-line report for the session-end trace event.
    pub fn report(&self) -> String {
        format!(
            "pre_checks={} blocked={} high_risk={} post_checks={} post_errors={} \
             nudges={} nudge_tokens={} nudge_cost_usd={:.4}",
            self.pre_checks,
            self.blocked_calls,
            self.high_risk_calls,
            self.post_checks,
            self.post_errors,
            self.nudges_injected,
            self.nudge_tokens,
            self.nudge_cost_usd
        )
    }
}
