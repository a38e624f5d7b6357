//! Tool types — the abstraction over agent capabilities.
//!
//! The session loop never invokes tools directly; requests flow through the
//! governed executor, which wraps the raw `ToolExecutor` supplied here.

use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Coarse-grained permission class of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionTier {
    /// Observes state without changing it.
    Read,
    /// Mutates files, memory, or configuration.
    Write,
    /// Runs arbitrary code or external processes.
    Exec,
}

impl std::fmt::Display for PermissionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
            Self::Exec => write!(f, "exec"),
        }
    }
}

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_call id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// The result of a tool execution (or a governance decision standing in
/// for one — denials and rejections are modeled identically so the model
/// can see the refusal reason).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// The output content, or an `Error: ...` string on failure
    pub output: String,

    /// Whether the execution (or decision) failed
    pub is_error: bool,

    /// Wall-clock duration of the call
    pub duration_ms: u64,
}

impl ToolOutcome {
    /// A successful outcome.
    pub fn ok(output: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            output: output.into(),
            is_error: false,
            duration_ms,
        }
    }

    /// A failed outcome. The message is surfaced to the model verbatim.
    pub fn error(message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            output: message.into(),
            is_error: true,
            duration_ms,
        }
    }
}

/// The raw tool executor supplied by the host system.
///
/// Failures are reported in-band via `ToolOutcome::is_error` — a tool-level
/// error is never fatal to the session.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, name: &str, arguments: &serde_json::Value) -> ToolOutcome;
}

/// A registered tool: its model-facing definition plus its permission tier.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub definition: ToolDefinition,
    pub tier: PermissionTier,
}

/// An explicit registry of available tools.
///
/// Passed through session construction — there is no ambient global tool
/// map. The session loop uses it to:
/// 1. Get tool definitions to send to the model
/// 2. Resolve permission tiers for governance decisions
pub struct ToolRegistry {
    tools: HashMap<String, ToolSpec>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, definition: ToolDefinition, tier: PermissionTier) {
        let name = definition.name.clone();
        self.tools.insert(name, ToolSpec { definition, tier });
    }

    /// Remove a tool by name. Returns the removed spec, if any.
    pub fn remove(&mut self, name: &str) -> Option<ToolSpec> {
        self.tools.remove(name)
    }

    /// Get a tool spec by name.
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(name)
    }

    /// Permission tier for a tool. Unknown tools default to `Read`.
    pub fn tier_of(&self, name: &str) -> PermissionTier {
        self.tools
            .get(name)
            .map(|s| s.tier)
            .unwrap_or(PermissionTier::Read)
    }

    /// Whether a tool is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool definitions (for sending to the model).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|s| s.definition.clone()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
