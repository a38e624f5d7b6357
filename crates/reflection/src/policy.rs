//! Reflection policy — the designated tool names, protected resources, and
//! claim patterns the heuristic checks operate on.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Category of a completion claim, matched against tool activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimCategory {
    /// Scheduling and cancellation of deferred tasks.
    Scheduler,
    /// Saving to persistent memory.
    Memory,
    /// Plugin install/remove.
    Plugin,
    /// File creation or update.
    File,
}

impl ClaimCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduler => "scheduler",
            Self::Memory => "memory",
            Self::Plugin => "plugin",
            Self::File => "file",
        }
    }
}

/// Configuration for every reflection heuristic.
///
/// Defaults match the tool vocabulary of the surrounding agent; deployments
/// with differently named tools override the relevant fields.
pub struct ReflectionPolicy {
    /// Tool that cancels a scheduled task.
    pub cancel_tool: String,
    /// Filename whose direct edits are blocked.
    pub protected_file: String,
    /// Tool recommended instead of editing the protected file.
    pub safe_update_tool: String,
    /// Reasoning-only tool (produces no external effect).
    pub think_tool: String,
    /// Shell execution tool.
    pub shell_tool: String,
    /// Argument keys inspected for file paths.
    pub path_keys: Vec<String>,
    /// Argument keys inspected for task ids.
    pub id_keys: Vec<String>,
    /// Expected prefix of a well-formed task id (hex ids also accepted).
    pub id_prefix: String,
    /// Claim phrases in final output, per category.
    pub claim_patterns: Vec<(ClaimCategory, Regex)>,
}

impl Default for ReflectionPolicy {
    fn default() -> Self {
        // Patterns are hardcoded and known-valid.
        let claim = |category, pattern: &str| (category, Regex::new(pattern).unwrap());
        Self {
            cancel_tool: "cancel_task".into(),
            protected_file: "config.json".into(),
            safe_update_tool: "update_config".into(),
            think_tool: "think".into(),
            shell_tool: "shell".into(),
            path_keys: vec![
                "path".into(),
                "file".into(),
                "filename".into(),
                "file_path".into(),
            ],
            id_keys: vec!["id".into(), "task_id".into()],
            id_prefix: "task_".into(),
            claim_patterns: vec![
                claim(
                    ClaimCategory::Scheduler,
                    r"(?i)\b(cancell?ed|scheduled|reminder (is )?set)\b",
                ),
                claim(
                    ClaimCategory::Memory,
                    r"(?i)\b(saved to memory|remembered|committed to memory)\b",
                ),
                claim(
                    ClaimCategory::Plugin,
                    r"(?i)\b(installed|uninstalled|removed) (the )?plugin\b",
                ),
                claim(
                    ClaimCategory::File,
                    r"(?i)\b(updated|created|wrote( to)?) (the )?file\b",
                ),
            ],
        }
    }
}

impl ReflectionPolicy {
    /// Map a tool name onto a claim category by vocabulary.
    pub fn category_of(&self, tool_name: &str) -> Option<ClaimCategory> {
        let name = tool_name.to_lowercase();
        if name.contains("schedule") || name.contains("cancel") || name.contains("remind") {
            Some(ClaimCategory::Scheduler)
        } else if name.contains("memory") || name.contains("remember") {
            Some(ClaimCategory::Memory)
        } else if name.contains("plugin") {
            Some(ClaimCategory::Plugin)
        } else if name.contains("write") || name.contains("edit") || name.contains("file") {
            Some(ClaimCategory::File)
        } else {
            None
        }
    }

    /// Shape check for a task id: the configured prefix, or bare hex of at
    /// least 8 characters.
    pub fn id_looks_valid(&self, id: &str) -> bool {
        if id.starts_with(&self.id_prefix) && id.len() > self.id_prefix.len() {
            return true;
        }
        id.len() >= 8 && id.chars().all(|c| c.is_ascii_hexdigit())
    }

    /// First file-path-like string argument, by configured key.
    pub fn path_argument<'a>(&self, arguments: &'a serde_json::Value) -> Option<&'a str> {
        self.path_keys
            .iter()
            .find_map(|key| arguments.get(key).and_then(|v| v.as_str()))
    }

    /// First id-like string argument, by configured key.
    pub fn id_argument<'a>(&self, arguments: &'a serde_json::Value) -> Option<&'a str> {
        self.id_keys
            .iter()
            .find_map(|key| arguments.get(key).and_then(|v| v.as_str()))
    }

    /// Whether a path argument targets the protected file.
    pub fn targets_protected_file(&self, path: &str) -> bool {
        std::path::Path::new(path)
            .file_name()
            .map(|name| name == self.protected_file.as_str())
            .unwrap_or(false)
    }
}
