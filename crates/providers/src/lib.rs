//! Model endpoint fallback resolution for Warden.
//!
//! The resolver wraps an ordered chain of `warden_core::ModelProvider`
//! candidates behind the same streaming interface as a single provider,
//! retrying across candidates on classified failure.

pub mod classify;
pub mod fallback;

pub use classify::FailureReason;
pub use fallback::{CooldownPolicy, FailoverNotice, FallbackResolver};
