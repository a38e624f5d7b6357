//! Failure classification for fallback decisions.
//!
//! Structured error variants classify directly; free-form messages (API
//! errors, interrupted streams) are sniffed by content. Classification is
//! an approximation tuned against real provider behavior, not a grammar.

use serde::{Deserialize, Serialize};
use warden_core::error::ProviderError;

/// Why a model endpoint failed, as far as fallback logic cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Short-horizon throttling (429-style).
    RateLimit,
    /// A longer billing/quota window is exhausted.
    QuotaWindow,
    /// Credentials rejected.
    Auth,
    /// Transport-level failure (DNS, connect, reset, timeout).
    Network,
    /// The caller cancelled the request. Never a fallback trigger.
    Aborted,
    /// Anything else.
    Unknown,
}

impl FailureReason {
    /// Classify a provider error.
    pub fn classify(error: &ProviderError) -> Self {
        match error {
            ProviderError::RateLimited { .. } => Self::RateLimit,
            ProviderError::QuotaExhausted(_) => Self::QuotaWindow,
            ProviderError::AuthenticationFailed(_) => Self::Auth,
            ProviderError::Network(_) | ProviderError::Timeout(_) => Self::Network,
            ProviderError::Aborted(_) => Self::Aborted,
            ProviderError::ApiError {
                status_code,
                message,
            } => Self::classify_status(*status_code, message),
            ProviderError::StreamInterrupted(msg) | ProviderError::NotConfigured(msg) => {
                Self::classify_text(msg)
            }
        }
    }

    fn classify_status(status: u16, message: &str) -> Self {
        match status {
            429 => Self::RateLimit,
            401 | 403 => Self::Auth,
            402 => Self::QuotaWindow,
            _ => Self::classify_text(message),
        }
    }

    /// Sniff a free-form error message.
    pub fn classify_text(message: &str) -> Self {
        let lower = message.to_lowercase();

        if lower.contains("abort") || lower.contains("cancell") || lower.contains("canceled") {
            Self::Aborted
        } else if lower.contains("rate limit")
            || lower.contains("too many requests")
            || lower.contains("429")
        {
            Self::RateLimit
        } else if lower.contains("quota") || lower.contains("billing") || lower.contains("credit")
        {
            Self::QuotaWindow
        } else if lower.contains("unauthorized")
            || lower.contains("forbidden")
            || lower.contains("api key")
            || lower.contains("authentication")
        {
            Self::Auth
        } else if lower.contains("connection")
            || lower.contains("network")
            || lower.contains("dns")
            || lower.contains("timed out")
            || lower.contains("timeout")
            || lower.contains("refused")
            || lower.contains("reset")
        {
            Self::Network
        } else {
            Self::Unknown
        }
    }

    /// Whether this failure should be retried on another candidate.
    pub fn triggers_fallback(&self) -> bool {
        !matches!(self, Self::Aborted)
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "rate_limit"),
            Self::QuotaWindow => write!(f, "quota_window"),
            Self::Auth => write!(f, "auth"),
            Self::Network => write!(f, "network"),
            Self::Aborted => write!(f, "aborted"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}
