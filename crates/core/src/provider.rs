//! ModelProvider trait — the abstraction over LLM backends.
//!
//! A provider knows how to send a session history to a model and stream the
//! response back as a live sequence of events (text, reasoning, tool-call
//! requests, final usage). The session loop consumes the stream without
//! knowing which backend produced it — pure polymorphism.
//!
//! Cancellation is handled at the call site: the controller races the
//! receiver against the session deadline, and dropping the receiver tears
//! the stream down.

use crate::error::ProviderError;
use crate::message::Message;
use crate::tool::ToolCall;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Configuration for a model request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// The model to use (e.g., "anthropic/claude-sonnet-4", "gpt-4o")
    pub model: String,

    /// The session history so far
    pub messages: Vec<Message>,

    /// Available tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

/// A tool definition sent to the model so it knows what tools it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// Token usage information, reported in the final stream event.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A single event in a streaming model response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Partial text content.
    TextDelta { content: String },

    /// Partial reasoning content (not shown to end users).
    ReasoningDelta { content: String },

    /// The model requests a tool invocation.
    ToolCallRequest { call: ToolCall },

    /// The stream is complete — usage and finish reason.
    Done {
        usage: Option<Usage>,
        finish_reason: String,
    },
}

/// The core ModelProvider trait.
///
/// Every model backend (and the fallback resolver that wraps several of
/// them) implements this trait.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// A human-readable identity for this endpoint (e.g., "openrouter/gpt-4o").
    fn name(&self) -> &str;

    /// Send a request and get a stream of response events.
    ///
    /// The returned channel yields events in generation order and ends after
    /// a `Done` event (or an error).
    async fn stream(
        &self,
        request: ModelRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamEvent, ProviderError>>,
        ProviderError,
    >;
}

/// An explicit registry of model providers.
///
/// Passed through session construction — there is no ambient process-wide
/// provider map. `add`/`remove`/`list` are the only mutation points.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ModelProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register a provider under its own name. Replaces any existing entry.
    pub fn add(&mut self, provider: Arc<dyn ModelProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    /// Remove a provider by name. Returns the removed entry, if any.
    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn ModelProvider>> {
        self.providers.remove(name)
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ModelProvider>> {
        self.providers.get(name).cloned()
    }

    /// List registered provider names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}
