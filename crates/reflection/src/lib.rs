//! Reflection engine for Warden sessions.
//!
//! Stateless heuristic checks run around every tool call and once at
//! session end: a pre-check that can block a call before execution, a
//! post-check that turns error signatures into targeted guidance, a
//! completion gate that catches unbacked claims in the final output, and a
//! behavioral-pattern detector for unproductive call sequences.
//!
//! All trigger conditions live in [`ReflectionPolicy`] — they are tuned
//! approximations of observed model behavior, not a formal grammar, and
//! callers may replace any of them.

pub mod check;
pub mod gate;
pub mod patterns;
pub mod policy;
pub mod summary;

pub use check::{PostCheckVerdict, PreCheckVerdict, Risk};
pub use gate::{CompletionContext, CompletionVerdict};
pub use patterns::{BehavioralContext, BehavioralPattern};
pub use policy::{ClaimCategory, ReflectionPolicy};
pub use summary::ReflectionSummary;
