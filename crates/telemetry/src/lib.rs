//! Observability for Warden sessions.
//!
//! Provides the phase-tagged trace/audit event stream emitted by the session
//! loop (the sole observability surface — external UIs and replay tooling
//! consume nothing else) and per-million-token pricing used for cost
//! accounting.

pub mod pricing;
pub mod trace;

pub use pricing::{ModelPricing, PricingTable};
pub use trace::{MemorySink, TraceEvent, TracePhase, TraceSink, TracingSink};
