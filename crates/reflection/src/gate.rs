//! Completion gate — catches final output that claims work the tools never
//! actually did.

use crate::policy::{ClaimCategory, ReflectionPolicy};
use std::collections::HashMap;

/// Aggregate tool activity for one session, fed to the gate at the end.
#[derive(Debug, Clone, Default)]
pub struct CompletionContext {
    pub tool_successes: u32,
    pub tool_errors: u32,
    successes_by_category: HashMap<ClaimCategory, u32>,
}

impl CompletionContext {
    /// Record one finished tool call.
    pub fn record(&mut self, category: Option<ClaimCategory>, is_error: bool) {
        if is_error {
            self.tool_errors += 1;
        } else {
            self.tool_successes += 1;
            if let Some(category) = category {
                *self.successes_by_category.entry(category).or_insert(0) += 1;
            }
        }
    }

    pub fn successes_in(&self, category: ClaimCategory) -> u32 {
        self.successes_by_category.get(&category).copied().unwrap_or(0)
    }
}

/// A failed gate: the output should not be accepted as-is.
#[derive(Debug, Clone)]
pub struct CompletionVerdict {
    /// Machine-readable reason tag.
    pub reason: String,
    /// Corrective message for the model.
    pub guidance: String,
}

impl ReflectionPolicy {
    /// Check the final output against recorded tool activity.
    ///
    /// Returns `None` when the output is acceptable.
    pub fn completion_gate(
        &self,
        output: &str,
        context: &CompletionContext,
    ) -> Option<CompletionVerdict> {
        for (category, pattern) in &self.claim_patterns {
            if pattern.is_match(output) && context.successes_in(*category) == 0 {
                return Some(CompletionVerdict {
                    reason: format!("missing_evidence_for_{}_claim", category.as_str()),
                    guidance: format!(
                        "Your answer claims a {} action, but no {} tool call succeeded \
                         this session. Perform the action with the right tool, or \
                         correct the answer.",
                        category.as_str(),
                        category.as_str()
                    ),
                });
            }
        }

        if context.tool_errors > 0
            && context.tool_successes == 0
            && !acknowledges_failure(output)
        {
            return Some(CompletionVerdict {
                reason: "unverified_completion_after_failures".into(),
                guidance: "Every tool call this session failed, yet the answer does not \
                           mention any problem. Either recover from the failures or state \
                           them plainly."
                    .into(),
            });
        }

        None
    }
}

fn acknowledges_failure(output: &str) -> bool {
    let text = output.to_lowercase();
    ["fail", "error", "couldn't", "could not", "unable", "wasn't able"]
        .iter()
        .any(|marker| text.contains(marker))
}
