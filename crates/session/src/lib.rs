//! The Warden session control loop.
//!
//! One session is one bounded, iterative dialogue between a model and a set
//! of governed tools. The controller owns all per-session state, enforces
//! the iteration/time/cost budgets, injects corrective nudges when the model
//! narrates instead of acting, isolates repeatedly failing tools, decays
//! stale tool output, and compacts history when the context grows too large.
//!
//! Sessions run strictly sequentially internally; concurrency exists across
//! sessions, each owning its own state.

pub mod config;
pub mod controller;
pub mod failure;
pub mod narration;
pub mod summarize;

pub use config::SessionConfig;
pub use controller::{SessionController, SessionOutcome};
pub use failure::{RecoveryAction, ToolFailureTracker};
pub use narration::{NarrationFinding, NarrationPolicy};
pub use summarize::{CompactionResult, Summarizer};
