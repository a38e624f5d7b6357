//! # Warden Core
//!
//! Domain types, traits, and error definitions for the Warden agent session
//! runtime. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod provider;
pub mod session;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, SessionError, ToolError};
pub use message::{Message, Role};
pub use provider::{
    ModelProvider, ModelRequest, ProviderRegistry, StreamEvent, ToolDefinition, Usage,
};
pub use session::{SessionBudgets, SessionState, SessionStatus, ToolOutputMarker};
pub use tool::{PermissionTier, ToolCall, ToolExecutor, ToolOutcome, ToolRegistry, ToolSpec};
