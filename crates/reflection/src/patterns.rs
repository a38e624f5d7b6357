//! Session-level behavioral pattern detection.
//!
//! Looks at call-shape statistics rather than individual outcomes; the
//! first matching pattern wins, strongest signal first.

use crate::policy::ReflectionPolicy;
use std::collections::HashMap;

/// Rolling call statistics maintained by the session loop.
#[derive(Debug, Clone, Default)]
pub struct BehavioralContext {
    /// Think-tool calls with no other tool in between.
    pub consecutive_think_calls: u32,
    /// Failure count per file path.
    pub failed_paths: HashMap<String, u32>,
    /// Shell-tool calls, total.
    pub shell_calls: u32,
    /// Calls to tools that produce an external effect (non-think,
    /// non-shell).
    pub productive_calls: u32,
    /// All tool calls.
    pub total_calls: u32,
    /// Think-tool calls, total.
    pub think_calls: u32,
}

impl BehavioralContext {
    /// Record one tool call by name.
    pub fn record_call(&mut self, policy: &ReflectionPolicy, tool_name: &str) {
        self.total_calls += 1;
        if tool_name == policy.think_tool {
            self.think_calls += 1;
            self.consecutive_think_calls += 1;
        } else {
            self.consecutive_think_calls = 0;
            if tool_name == policy.shell_tool {
                self.shell_calls += 1;
            } else {
                self.productive_calls += 1;
            }
        }
    }

    /// Record a path-specific failure.
    pub fn record_path_failure(&mut self, path: &str) {
        *self.failed_paths.entry(path.to_string()).or_insert(0) += 1;
    }
}

/// An unproductive behavior worth steering away from.
#[derive(Debug, Clone, PartialEq)]
pub enum BehavioralPattern {
    ThinkLoop { count: u32 },
    RepeatedPathFailure { path: String, count: u32 },
    ShellExecOveruse { shell_calls: u32 },
    ThinkHeavy { think_calls: u32, total_calls: u32 },
}

impl BehavioralPattern {
    /// Corrective message injected when the pattern fires.
    pub fn guidance(&self) -> String {
        match self {
            Self::ThinkLoop { count } => format!(
                "You have called the think tool {count} times in a row without acting. \
                 Take a concrete action or give your final answer."
            ),
            Self::RepeatedPathFailure { path, count } => format!(
                "The path '{path}' has failed {count} times. It does not exist as \
                 written; list the directory and use a real path."
            ),
            Self::ShellExecOveruse { shell_calls } => format!(
                "{shell_calls} shell commands with almost no other tool use. Prefer the \
                 purpose-built tools over raw shell."
            ),
            Self::ThinkHeavy {
                think_calls,
                total_calls,
            } => format!(
                "{think_calls} of {total_calls} calls were reasoning-only. Spend the \
                 remaining budget on actions, not deliberation."
            ),
        }
    }
}

impl ReflectionPolicy {
    /// Detect the strongest current pattern, if any.
    pub fn behavioral_patterns(&self, context: &BehavioralContext) -> Option<BehavioralPattern> {
        if context.consecutive_think_calls >= 3 {
            return Some(BehavioralPattern::ThinkLoop {
                count: context.consecutive_think_calls,
            });
        }

        if let Some((path, count)) = context
            .failed_paths
            .iter()
            .find(|(_, count)| **count >= 3)
        {
            return Some(BehavioralPattern::RepeatedPathFailure {
                path: path.clone(),
                count: *count,
            });
        }

        if context.shell_calls >= 8 && context.productive_calls <= 1 {
            return Some(BehavioralPattern::ShellExecOveruse {
                shell_calls: context.shell_calls,
            });
        }

        if context.total_calls >= 5
            && context.think_calls as f64 > context.total_calls as f64 * 0.4
        {
            return Some(BehavioralPattern::ThinkHeavy {
                think_calls: context.think_calls,
                total_calls: context.total_calls,
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn think_loop_fires_at_three_consecutive() {
        let policy = ReflectionPolicy::default();
        let mut context = BehavioralContext::default();
        context.record_call(&policy, "think");
        context.record_call(&policy, "think");
        assert!(policy.behavioral_patterns(&context).is_none());

        context.record_call(&policy, "think");
        assert_eq!(
            policy.behavioral_patterns(&context),
            Some(BehavioralPattern::ThinkLoop { count: 3 })
        );
    }

    #[test]
    fn productive_call_resets_think_streak() {
        let policy = ReflectionPolicy::default();
        let mut context = BehavioralContext::default();
        context.record_call(&policy, "think");
        context.record_call(&policy, "think");
        context.record_call(&policy, "read_file");
        context.record_call(&policy, "think");
        assert!(policy.behavioral_patterns(&context).is_none());
    }

    #[test]
    fn think_loop_outranks_path_failure() {
        let policy = ReflectionPolicy::default();
        let mut context = BehavioralContext::default();
        for _ in 0..3 {
            context.record_call(&policy, "think");
        }
        for _ in 0..3 {
            context.record_path_failure("/tmp/ghost");
        }
        assert!(matches!(
            policy.behavioral_patterns(&context),
            Some(BehavioralPattern::ThinkLoop { .. })
        ));
    }

    #[test]
    fn repeated_path_failure_at_three() {
        let policy = ReflectionPolicy::default();
        let mut context = BehavioralContext::default();
        context.record_path_failure("/tmp/ghost");
        context.record_path_failure("/tmp/ghost");
        assert!(policy.behavioral_patterns(&context).is_none());
        context.record_path_failure("/tmp/ghost");
        assert_eq!(
            policy.behavioral_patterns(&context),
            Some(BehavioralPattern::RepeatedPathFailure {
                path: "/tmp/ghost".into(),
                count: 3
            })
        );
    }

    #[test]
    fn shell_overuse_needs_low_productive_count() {
        let policy = ReflectionPolicy::default();
        let mut context = BehavioralContext::default();
        for _ in 0..8 {
            context.record_call(&policy, "shell");
        }
        context.record_call(&policy, "read_file");
        assert!(matches!(
            policy.behavioral_patterns(&context),
            Some(BehavioralPattern::ShellExecOveruse { shell_calls: 8 })
        ));

        // A second productive call clears the signal
        context.record_call(&policy, "read_file");
        assert!(policy.behavioral_patterns(&context).is_none());
    }

    #[test]
    fn think_heavy_ratio() {
        let policy = ReflectionPolicy::default();
        let mut context = BehavioralContext::default();
        // 3 of 6 calls reasoning-only (50% > 40%), never 3 consecutive
        for _ in 0..3 {
            context.record_call(&policy, "think");
            context.record_call(&policy, "read_file");
        }
        assert_eq!(
            policy.behavioral_patterns(&context),
            Some(BehavioralPattern::ThinkHeavy {
                think_calls: 3,
                total_calls: 6
            })
        );
    }

    #[test]
    fn under_five_calls_never_think_heavy() {
        let policy = ReflectionPolicy::default();
        let mut context = BehavioralContext::default();
        context.record_call(&policy, "think");
        context.record_call(&policy, "read_file");
        context.record_call(&policy, "think");
        context.record_call(&policy, "read_file");
        assert!(policy.behavioral_patterns(&context).is_none());
    }
}
