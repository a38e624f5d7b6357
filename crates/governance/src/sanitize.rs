//! Argument sanitization and injection-pattern scanning.
//!
//! Sanitization strips embedded NUL bytes from every string argument.
//! The injection scan is informational only: a match produces an audit
//! event, never a block — tool output legitimately quotes suspicious text
//! all the time.

use regex::Regex;
use serde_json::Value;

/// Marker appended to audit values truncated past the limit.
const TRUNCATION_MARKER: &str = "…[truncated]";

/// Maximum argument string length carried into audit events.
const AUDIT_VALUE_LIMIT: usize = 500;

/// Strip embedded NUL bytes from all string values, recursively.
pub fn sanitize_arguments(arguments: &Value) -> Value {
    match arguments {
        Value::String(s) if s.contains('\0') => Value::String(s.replace('\0', "")),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_arguments).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), sanitize_arguments(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Truncate a string for inclusion in an audit event.
pub fn truncate_for_audit(value: &str) -> String {
    if value.chars().count() <= AUDIT_VALUE_LIMIT {
        return value.to_string();
    }
    let mut truncated: String = value.chars().take(AUDIT_VALUE_LIMIT).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Configurable prompt-injection pattern set.
///
/// Trigger conditions are policy, not constants — the defaults are tuned
/// against observed model behavior and callers may replace them wholesale.
pub struct InjectionPolicy {
    patterns: Vec<Regex>,
}

impl InjectionPolicy {
    /// Build a policy from raw pattern strings.
    pub fn new(patterns: &[&str]) -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    /// Scan every string argument. Returns the first matched pattern text.
    pub fn scan(&self, arguments: &Value) -> Option<String> {
        match arguments {
            Value::String(s) => self
                .patterns
                .iter()
                .find_map(|re| re.find(s))
                .map(|m| m.as_str().to_string()),
            Value::Array(items) => items.iter().find_map(|v| self.scan(v)),
            Value::Object(map) => map.values().find_map(|v| self.scan(v)),
            _ => None,
        }
    }
}

impl Default for InjectionPolicy {
    fn default() -> Self {
        // Patterns are hardcoded and known-valid.
        Self::new(&[
            r"(?i)ignore (all )?previous instructions",
            r"(?i)disregard all",
            r"(?i)new system prompt",
            r"(?i)you are now",
            r"(?i)forget your",
            r"(?i)override your",
            r"(?i)jailbreak",
            r"(?i)developer mode",
        ])
        .unwrap()
    }
}
