//! Pre- and post-execution checks for individual tool calls.
//!
//! The pre-check can block a call outright (unknown tool, protected file);
//! the post-check never blocks anything, it translates error signatures
//! into guidance the model can act on in the next iteration.

use crate::policy::ReflectionPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use warden_core::tool::{PermissionTier, ToolOutcome, ToolSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Low,
    Medium,
    High,
}

/// Verdict issued before a tool call executes.
#[derive(Debug, Clone)]
pub struct PreCheckVerdict {
    pub risk: Risk,
    pub block: bool,
    pub recommendation: Option<String>,
}

impl PreCheckVerdict {
    fn low() -> Self {
        Self {
            risk: Risk::Low,
            block: false,
            recommendation: None,
        }
    }
}

/// Verdict issued after a tool call returns.
#[derive(Debug, Clone)]
pub struct PostCheckVerdict {
    pub ok: bool,
    pub should_nudge: bool,
    pub guidance: Option<String>,
}

impl PostCheckVerdict {
    fn ok() -> Self {
        Self {
            ok: true,
            should_nudge: false,
            guidance: None,
        }
    }

    fn nudge(guidance: impl Into<String>) -> Self {
        Self {
            ok: false,
            should_nudge: true,
            guidance: Some(guidance.into()),
        }
    }
}

impl ReflectionPolicy {
    /// Inspect a tool call before execution.
    ///
    /// `spec` is the registry entry; `None` means the model asked for a
    /// tool that does not exist, which is always blocked.
    pub fn pre_check(
        &self,
        tool_name: &str,
        arguments: &serde_json::Value,
        spec: Option<&ToolSpec>,
    ) -> PreCheckVerdict {
        let Some(spec) = spec else {
            return PreCheckVerdict {
                risk: Risk::High,
                block: true,
                recommendation: Some(format!(
                    "Tool '{tool_name}' is not registered. Use one of the available tools."
                )),
            };
        };

        if matches!(spec.tier, PermissionTier::Write | PermissionTier::Exec)
            && let Some(path) = self.path_argument(arguments)
            && self.targets_protected_file(path)
            && tool_name != self.safe_update_tool
        {
            return PreCheckVerdict {
                risk: Risk::High,
                block: true,
                recommendation: Some(format!(
                    "Direct edits to {} are blocked. Use the '{}' tool instead.",
                    self.protected_file, self.safe_update_tool
                )),
            };
        }

        let empty_args = arguments.as_object().map(|m| m.is_empty()).unwrap_or(false)
            || arguments.is_null();
        if empty_args
            && matches!(spec.tier, PermissionTier::Write | PermissionTier::Exec)
        {
            debug!(tool = tool_name, "Mutating tool called with empty arguments");
            return PreCheckVerdict {
                risk: Risk::Medium,
                block: false,
                recommendation: Some(format!(
                    "'{tool_name}' was called with no arguments; the call will likely fail."
                )),
            };
        }

        if tool_name == self.cancel_tool {
            let id_ok = self
                .id_argument(arguments)
                .map(|id| self.id_looks_valid(id))
                .unwrap_or(false);
            if !id_ok {
                return PreCheckVerdict {
                    risk: Risk::Medium,
                    block: false,
                    recommendation: Some(
                        "The task id does not look like a real id. List scheduled tasks \
                         first to obtain one."
                            .into(),
                    ),
                };
            }
        }

        PreCheckVerdict::low()
    }

    /// Inspect a tool outcome after execution.
    ///
    /// `failed_paths` carries prior failure counts per path so repeated
    /// failures escalate the wording.
    pub fn post_check(
        &self,
        tool_name: &str,
        arguments: &serde_json::Value,
        outcome: &ToolOutcome,
        failed_paths: &HashMap<String, u32>,
    ) -> PostCheckVerdict {
        if !outcome.is_error {
            return PostCheckVerdict::ok();
        }

        let error = outcome.output.to_lowercase();

        // Signatures checked most-specific first.
        if tool_name == self.cancel_tool && error.contains("not found") {
            return PostCheckVerdict::nudge(
                "That task id does not exist. List the scheduled tasks to get valid \
                 ids before cancelling.",
            );
        }

        if error.contains(&self.protected_file.to_lowercase()) {
            return PostCheckVerdict::nudge(format!(
                "{} cannot be modified directly. Use the '{}' tool.",
                self.protected_file, self.safe_update_tool
            ));
        }

        if error.contains("not found") || error.contains("no such file") {
            let path = self.path_argument(arguments).unwrap_or_default();
            let prior = failed_paths.get(path).copied().unwrap_or(0);
            let guidance = if prior >= 2 {
                format!(
                    "'{path}' has now failed {} times. Stop guessing this path; list \
                     the parent directory and use a path that actually exists.",
                    prior + 1
                )
            } else {
                format!("'{path}' was not found. List the parent directory to locate it.")
            };
            return PostCheckVerdict::nudge(guidance);
        }

        if error.contains("permission denied") {
            return PostCheckVerdict::nudge(format!(
                "'{tool_name}' was denied by policy. Do not retry it; accomplish the \
                 task with an allowed tool or report the restriction."
            ));
        }

        if error.contains("requires confirmation") {
            return PostCheckVerdict::nudge(format!(
                "'{tool_name}' needs user confirmation, which is unavailable here. \
                 Choose an approach that does not require it."
            ));
        }

        if error.contains("syntax error") {
            return PostCheckVerdict::nudge(
                "The shell command had a syntax error. Simplify the command and avoid \
                 unquoted special characters.",
            );
        }

        PostCheckVerdict::nudge(format!(
            "'{tool_name}' failed: {}. Adjust the parameters instead of repeating the \
             same call.",
            outcome.output
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_core::provider::ToolDefinition;

    fn spec(name: &str, tier: PermissionTier) -> ToolSpec {
        ToolSpec {
            definition: ToolDefinition {
                name: name.into(),
                description: "test".into(),
                parameters: json!({"type": "object"}),
            },
            tier,
        }
    }

    #[test]
    fn unknown_tool_blocks() {
        let policy = ReflectionPolicy::default();
        let verdict = policy.pre_check("teleport", &json!({}), None);
        assert_eq!(verdict.risk, Risk::High);
        assert!(verdict.block);
    }

    #[test]
    fn protected_file_edit_always_blocks() {
        let policy = ReflectionPolicy::default();
        for args in [
            json!({"path": "config.json", "content": "x"}),
            json!({"file_path": "/home/agent/config.json", "content": "harmless"}),
        ] {
            let verdict =
                policy.pre_check("write_file", &args, Some(&spec("write_file", PermissionTier::Write)));
            assert_eq!(verdict.risk, Risk::High);
            assert!(verdict.block);
            assert!(verdict.recommendation.unwrap().contains("update_config"));
        }
    }

    #[test]
    fn read_of_protected_file_is_allowed() {
        let policy = ReflectionPolicy::default();
        let verdict = policy.pre_check(
            "read_file",
            &json!({"path": "config.json"}),
            Some(&spec("read_file", PermissionTier::Read)),
        );
        assert!(!verdict.block);
        assert_eq!(verdict.risk, Risk::Low);
    }

    #[test]
    fn safe_update_tool_may_touch_protected_file() {
        let policy = ReflectionPolicy::default();
        let verdict = policy.pre_check(
            "update_config",
            &json!({"path": "config.json", "key": "tone"}),
            Some(&spec("update_config", PermissionTier::Write)),
        );
        assert!(!verdict.block);
    }

    #[test]
    fn empty_args_on_mutating_tool_is_medium() {
        let policy = ReflectionPolicy::default();
        let verdict =
            policy.pre_check("shell", &json!({}), Some(&spec("shell", PermissionTier::Exec)));
        assert_eq!(verdict.risk, Risk::Medium);
        assert!(!verdict.block);

        // Read tools are allowed empty args
        let verdict =
            policy.pre_check("list_tasks", &json!({}), Some(&spec("list_tasks", PermissionTier::Read)));
        assert_eq!(verdict.risk, Risk::Low);
    }

    #[test]
    fn malformed_cancel_id_is_medium() {
        let policy = ReflectionPolicy::default();
        let verdict = policy.pre_check(
            "cancel_task",
            &json!({"id": "the meeting tomorrow"}),
            Some(&spec("cancel_task", PermissionTier::Write)),
        );
        assert_eq!(verdict.risk, Risk::Medium);
        assert!(!verdict.block);

        let verdict = policy.pre_check(
            "cancel_task",
            &json!({"id": "task_17"}),
            Some(&spec("cancel_task", PermissionTier::Write)),
        );
        assert_eq!(verdict.risk, Risk::Low);
    }

    #[test]
    fn post_check_success_never_nudges() {
        let policy = ReflectionPolicy::default();
        let verdict = policy.post_check(
            "shell",
            &json!({"command": "ls"}),
            &ToolOutcome::ok("files", 3),
            &HashMap::new(),
        );
        assert!(verdict.ok);
        assert!(!verdict.should_nudge);
    }

    #[test]
    fn cancel_not_found_outranks_generic_not_found() {
        let policy = ReflectionPolicy::default();
        let verdict = policy.post_check(
            "cancel_task",
            &json!({"id": "task_99"}),
            &ToolOutcome::error("Error: task not found", 2),
            &HashMap::new(),
        );
        assert!(verdict.should_nudge);
        assert!(verdict.guidance.unwrap().contains("scheduled tasks"));
    }

    #[test]
    fn repeated_path_failure_escalates_wording() {
        let policy = ReflectionPolicy::default();
        let args = json!({"path": "/tmp/ghost.txt"});
        let outcome = ToolOutcome::error("Error: /tmp/ghost.txt not found", 2);

        let first = policy.post_check("read_file", &args, &outcome, &HashMap::new());
        assert!(!first.guidance.unwrap().contains("Stop guessing"));

        let mut failed = HashMap::new();
        failed.insert("/tmp/ghost.txt".to_string(), 2);
        let later = policy.post_check("read_file", &args, &outcome, &failed);
        assert!(later.guidance.unwrap().contains("Stop guessing"));
    }

    #[test]
    fn every_error_branch_nudges() {
        let policy = ReflectionPolicy::default();
        for message in [
            "Error: permission denied for tool 'shell' (tier exec)",
            "Error: tool 'write_file' requires confirmation but no interactive session",
            "Error: sh: syntax error near unexpected token",
            "Error: something completely different",
        ] {
            let verdict = policy.post_check(
                "shell",
                &json!({"command": "x"}),
                &ToolOutcome::error(message, 2),
                &HashMap::new(),
            );
            assert!(verdict.should_nudge, "no nudge for: {message}");
            assert!(verdict.guidance.is_some());
        }
    }
}
