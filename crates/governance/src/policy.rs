//! Permission policy — base action per tier plus per-tool overrides.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use warden_core::tool::PermissionTier;

/// What happens when a tool at a given tier is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyAction {
    /// Proceed without asking.
    AutoAllow,
    /// Ask the confirmation delegate first.
    Confirm,
    /// Refuse without ever calling the raw executor.
    Deny,
}

/// Immutable per-session governance configuration.
///
/// A per-tool override always wins over the tier default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernancePolicy {
    pub read: PolicyAction,
    pub write: PolicyAction,
    pub exec: PolicyAction,

    #[serde(default)]
    pub overrides: HashMap<String, PolicyAction>,
}

impl Default for GovernancePolicy {
    fn default() -> Self {
        Self {
            read: PolicyAction::AutoAllow,
            write: PolicyAction::Confirm,
            exec: PolicyAction::Confirm,
            overrides: HashMap::new(),
        }
    }
}

impl GovernancePolicy {
    /// A policy that auto-allows every tier. Required for non-interactive
    /// contexts (scheduled jobs) where no confirmation delegate exists.
    pub fn auto_allow_all() -> Self {
        Self {
            read: PolicyAction::AutoAllow,
            write: PolicyAction::AutoAllow,
            exec: PolicyAction::AutoAllow,
            overrides: HashMap::new(),
        }
    }

    /// Add a per-tool override.
    pub fn with_override(mut self, tool: impl Into<String>, action: PolicyAction) -> Self {
        self.overrides.insert(tool.into(), action);
        self
    }

    /// The base action for a tier.
    pub fn tier_default(&self, tier: PermissionTier) -> PolicyAction {
        match tier {
            PermissionTier::Read => self.read,
            PermissionTier::Write => self.write,
            PermissionTier::Exec => self.exec,
        }
    }

    /// Effective action for a tool: the override if present, else the tier
    /// default.
    pub fn effective_action(&self, tool: &str, tier: PermissionTier) -> PolicyAction {
        self.overrides
            .get(tool)
            .copied()
            .unwrap_or_else(|| self.tier_default(tier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_tiers() {
        let policy = GovernancePolicy::default();
        assert_eq!(
            policy.tier_default(PermissionTier::Read),
            PolicyAction::AutoAllow
        );
        assert_eq!(
            policy.tier_default(PermissionTier::Write),
            PolicyAction::Confirm
        );
        assert_eq!(
            policy.tier_default(PermissionTier::Exec),
            PolicyAction::Confirm
        );
    }

    #[test]
    fn override_wins_over_tier_default() {
        let policy = GovernancePolicy::default().with_override("shell", PolicyAction::Deny);
        assert_eq!(
            policy.effective_action("shell", PermissionTier::Exec),
            PolicyAction::Deny
        );
        // Other exec tools keep the tier default
        assert_eq!(
            policy.effective_action("python", PermissionTier::Exec),
            PolicyAction::Confirm
        );
    }

    #[test]
    fn auto_allow_all_has_no_confirm() {
        let policy = GovernancePolicy::auto_allow_all();
        for tier in [
            PermissionTier::Read,
            PermissionTier::Write,
            PermissionTier::Exec,
        ] {
            assert_eq!(policy.tier_default(tier), PolicyAction::AutoAllow);
        }
    }

    #[test]
    fn policy_serialization() {
        let policy = GovernancePolicy::default().with_override("rm", PolicyAction::Deny);
        let json = serde_json::to_string(&policy).unwrap();
        assert!(json.contains("auto-allow"));
        let roundtrip: GovernancePolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip.overrides.get("rm"), Some(&PolicyAction::Deny));
    }
}
