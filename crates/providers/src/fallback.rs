//! Fallback resolver — ordered retry chain over model endpoints.
//!
//! When a candidate fails with a classified, non-abort failure, the resolver
//! notifies an optional observer and retries with the next candidate. An
//! aborted request propagates immediately: cancellation is a caller decision,
//! not an endpoint fault.
//!
//! A cooldown policy (for chains multiplexing one upstream account) parks a
//! candidate for a window after qualifying failures; selection skips parked
//! candidates, and only an entirely parked chain is a hard failure. The
//! cooldown map is the one piece of state shared across concurrent sessions
//! using the same resolver and is guarded accordingly.

use crate::classify::FailureReason;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use warden_core::error::ProviderError;
use warden_core::provider::{ModelProvider, ModelRequest, StreamEvent};

/// Passed to the failover observer once per failover decision.
#[derive(Debug)]
pub struct FailoverNotice<'a> {
    /// Identity of the endpoint that just failed.
    pub failed_endpoint: &'a str,
    /// The classified error that triggered the failover.
    pub error: &'a ProviderError,
    /// Identity of the endpoint that will be attempted next.
    pub selected_endpoint: &'a str,
    /// Position of the selected endpoint in the chain.
    pub fallback_index: usize,
}

type FailoverObserver = Box<dyn Fn(&FailoverNotice<'_>) + Send + Sync>;

/// When and for how long failing candidates are parked.
#[derive(Debug, Clone)]
pub struct CooldownPolicy {
    /// How long a qualifying failure parks a candidate.
    pub duration: Duration,
    /// Which classified reasons trigger a cooldown.
    pub triggers: HashSet<FailureReason>,
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(60),
            triggers: HashSet::from([
                FailureReason::RateLimit,
                FailureReason::QuotaWindow,
                FailureReason::Auth,
            ]),
        }
    }
}

/// A provider that wraps an ordered candidate chain and falls back on
/// classified failure.
pub struct FallbackResolver {
    /// Composite identity: all candidate identities joined with '+'.
    name: String,
    chain: Vec<Arc<dyn ModelProvider>>,
    observer: Option<FailoverObserver>,
    cooldown: Option<CooldownPolicy>,
    /// Expiry per candidate identity. Written on qualifying failures, read
    /// before each attempt. Shared across sessions using this resolver.
    cooling_until: Mutex<HashMap<String, Instant>>,
}

impl FallbackResolver {
    /// Build a resolver over `[primary, ...fallbacks]`.
    pub fn new(chain: Vec<Arc<dyn ModelProvider>>) -> Self {
        let name = chain
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join("+");
        Self {
            name,
            chain,
            observer: None,
            cooldown: None,
            cooling_until: Mutex::new(HashMap::new()),
        }
    }

    /// Attach an observer invoked once per failover decision.
    pub fn with_observer(
        mut self,
        observer: impl Fn(&FailoverNotice<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Enable per-candidate cooldowns.
    pub fn with_cooldown(mut self, policy: CooldownPolicy) -> Self {
        self.cooldown = Some(policy);
        self
    }

    /// Number of candidates in the chain.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    fn is_cooling(&self, endpoint: &str, now: Instant) -> bool {
        self.cooling_until
            .lock()
            .unwrap()
            .get(endpoint)
            .is_some_and(|until| *until > now)
    }

    fn park(&self, endpoint: &str, reason: FailureReason) {
        let Some(policy) = &self.cooldown else {
            return;
        };
        if !policy.triggers.contains(&reason) {
            return;
        }
        let until = Instant::now() + policy.duration;
        self.cooling_until
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), until);
        info!(
            endpoint = %endpoint,
            reason = %reason,
            cooldown_secs = policy.duration.as_secs(),
            "Fallback: candidate parked"
        );
    }

    /// Index and identity of the next usable candidate after `after`.
    fn next_available(&self, after: usize, now: Instant) -> Option<(usize, &str)> {
        self.chain
            .iter()
            .enumerate()
            .skip(after + 1)
            .map(|(i, p)| (i, p.name()))
            .find(|(_, name)| !self.is_cooling(name, now))
    }

    /// Seconds until the earliest cooldown in the chain expires.
    fn earliest_expiry_secs(&self, now: Instant) -> u64 {
        self.cooling_until
            .lock()
            .unwrap()
            .values()
            .filter(|until| **until > now)
            .map(|until| until.duration_since(now).as_secs())
            .min()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ModelProvider for FallbackResolver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(
        &self,
        request: ModelRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamEvent, ProviderError>>,
        ProviderError,
    > {
        if self.chain.is_empty() {
            return Err(ProviderError::NotConfigured(
                "No candidates in fallback chain".into(),
            ));
        }

        let mut last_error: Option<ProviderError> = None;

        for (i, candidate) in self.chain.iter().enumerate() {
            let endpoint = candidate.name().to_string();
            let now = Instant::now();

            if self.is_cooling(&endpoint, now) {
                debug!(endpoint = %endpoint, "Fallback: skipping candidate in cooldown");
                continue;
            }

            info!(
                endpoint = %endpoint,
                attempt = i + 1,
                total = self.chain.len(),
                "Fallback: trying candidate"
            );

            match candidate.stream(request.clone()).await {
                Ok(rx) => return Ok(rx),
                Err(e) => {
                    let reason = FailureReason::classify(&e);

                    if !reason.triggers_fallback() {
                        debug!(endpoint = %endpoint, "Fallback: aborted, propagating");
                        return Err(e);
                    }

                    warn!(
                        endpoint = %endpoint,
                        reason = %reason,
                        error = %e,
                        "Fallback: candidate failed"
                    );

                    self.park(&endpoint, reason);

                    if let Some((index, selected)) = self.next_available(i, Instant::now())
                        && let Some(observer) = &self.observer
                    {
                        observer(&FailoverNotice {
                            failed_endpoint: &endpoint,
                            error: &e,
                            selected_endpoint: selected,
                            fallback_index: index,
                        });
                    }

                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            // Every candidate was skipped in cooldown.
            None => Err(ProviderError::RateLimited {
                retry_after_secs: self.earliest_expiry_secs(Instant::now()),
            }),
        }
    }
}
