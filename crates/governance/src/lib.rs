//! Governed tool execution for Warden.
//!
//! Raw tool invocation is wrapped with a permission gate, an optional
//! confirmation workflow, per-session rate limiting, and argument
//! sanitization. Governance refusals are modeled as ordinary tool errors so
//! the model (or a human, via the confirmation delegate) always sees the
//! refusal reason.

pub mod executor;
pub mod policy;
pub mod rate_limit;
pub mod sanitize;

pub use executor::{Confirmation, ConfirmationDelegate, GovernedExecutor};
pub use policy::{GovernancePolicy, PolicyAction};
pub use rate_limit::{RateLimitPolicy, SessionRateLimiter};
pub use sanitize::{InjectionPolicy, sanitize_arguments, truncate_for_audit};
