//! Consecutive tool-failure tracking.
//!
//! Consulted once per iteration with that iteration's complete result
//! batch. Two signals: a per-tool consecutive-failure counter (forgotten
//! the moment the tool succeeds) and a global all-fail streak across
//! iterations (reset the moment anything succeeds). The streak is the
//! stronger signal and wins when both fire.

use std::collections::HashMap;
use tracing::warn;

/// Failures of one tool before it gets called out by name.
const PER_TOOL_THRESHOLD: u32 = 2;

/// Iterations in which every tool call failed before retries are shut down.
const ALL_FAIL_STREAK_THRESHOLD: u32 = 3;

/// Corrective action returned when a threshold is crossed.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryAction {
    /// Every tool call has failed for `count` consecutive iterations.
    AllFailStreak { count: u32 },
    /// Specific tools have failed consecutively; `(name, count)` pairs.
    RepeatedToolFailure { tools: Vec<(String, u32)> },
}

impl RecoveryAction {
    /// The corrective message injected into history.
    pub fn message(&self) -> String {
        match self {
            Self::AllFailStreak { count } => format!(
                "Every tool call has failed for {count} iterations in a row. Stop \
                 retrying tools entirely; summarize what you attempted and what went \
                 wrong, and give your best answer with the information you have."
            ),
            Self::RepeatedToolFailure { tools } => {
                let listing = tools
                    .iter()
                    .map(|(name, count)| format!("'{name}' ({count}x)"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "These tools are failing repeatedly: {listing}. Do not call them \
                     again with the same arguments; change approach or use a \
                     different tool."
                )
            }
        }
    }
}

/// Per-session failure state. Lifecycle matches the session.
#[derive(Debug, Default)]
pub struct ToolFailureTracker {
    counters: HashMap<String, u32>,
    all_fail_streak: u32,
}

impl ToolFailureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one iteration's results as `(tool_name, is_error)` pairs and
    /// decide whether a corrective action is warranted.
    pub fn process(&mut self, results: &[(String, bool)]) -> Option<RecoveryAction> {
        if results.is_empty() {
            return None;
        }

        for (name, is_error) in results {
            if *is_error {
                *self.counters.entry(name.clone()).or_insert(0) += 1;
            } else {
                self.counters.remove(name);
            }
        }

        if results.iter().all(|(_, is_error)| *is_error) {
            self.all_fail_streak += 1;
        } else {
            self.all_fail_streak = 0;
        }

        if self.all_fail_streak >= ALL_FAIL_STREAK_THRESHOLD {
            warn!(streak = self.all_fail_streak, "All tool calls failing");
            return Some(RecoveryAction::AllFailStreak {
                count: self.all_fail_streak,
            });
        }

        let mut failing: Vec<(String, u32)> = self
            .counters
            .iter()
            .filter(|(_, count)| **count >= PER_TOOL_THRESHOLD)
            .map(|(name, count)| (name.clone(), *count))
            .collect();
        if !failing.is_empty() {
            failing.sort();
            return Some(RecoveryAction::RepeatedToolFailure { tools: failing });
        }

        None
    }
}
