//! Text heuristics for the no-tool-call path.
//!
//! When the model returns text without any tool calls, the loop checks
//! whether that text is actually a final answer or one of three known
//! stall patterns. The trigger conditions are tuned approximations of
//! observed model behavior, carried as configurable policy.

use regex::Regex;

/// Which stall pattern the text matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationFinding {
    /// Announcing an intended action instead of taking it.
    PlanningNarration,
    /// A tool call written as text instead of issued structurally.
    FakeToolCall,
    /// A past-tense action claim with no tool call ever made.
    HallucinatedCompletion,
}

impl NarrationFinding {
    /// The corrective message injected for this finding.
    pub fn guidance(&self) -> &'static str {
        match self {
            Self::PlanningNarration => {
                "You described what you intend to do instead of doing it. Issue the \
                 actual tool call now, or give the final answer directly."
            }
            Self::FakeToolCall => {
                "You wrote a tool call as plain text. Tool calls must be issued \
                 through the tool-calling interface, not written into the response."
            }
            Self::HallucinatedCompletion => {
                "You claim to have performed an action, but no tool was ever called \
                 this session. Perform the action with the appropriate tool, or \
                 correct your answer."
            }
        }
    }
}

/// Trigger configuration for the narration heuristics.
pub struct NarrationPolicy {
    /// Text longer than this is never treated as planning narration.
    pub max_narration_chars: usize,
    planning_phrases: Regex,
    concrete_markers: Vec<Regex>,
    fake_call: Regex,
    completion_claims: Regex,
}

impl Default for NarrationPolicy {
    fn default() -> Self {
        // Patterns are hardcoded and known-valid.
        Self {
            max_narration_chars: 300,
            planning_phrases: Regex::new(
                r"(?i)\b(i will|i'll|let me|i need to|i'm going to|i am going to|first,? i)\b",
            )
            .unwrap(),
            concrete_markers: vec![
                Regex::new(r"\d{2,}").unwrap(),
                Regex::new(r"https?://").unwrap(),
                Regex::new(r"```").unwrap(),
                Regex::new(r"(?i)\bthe (result|answer) is\b").unwrap(),
            ],
            fake_call: Regex::new(r"\b[a-zA-Z_][a-zA-Z0-9_]*\(\s*[a-zA-Z_][a-zA-Z0-9_]*\s*=")
                .unwrap(),
            completion_claims: Regex::new(
                r"(?i)\b(i've|i have) (scheduled|saved|cancell?ed|created|updated|installed|removed|deleted|set up)\b",
            )
            .unwrap(),
        }
    }
}

impl NarrationPolicy {
    /// Build a policy from raw pattern strings.
    ///
    /// `planning_phrases`, `fake_call` and `completion_claims` are single
    /// regexes; `concrete_markers` is a set of patterns any one of which
    /// marks the text as a real answer rather than narration.
    pub fn new(
        planning_phrases: &str,
        concrete_markers: &[&str],
        fake_call: &str,
        completion_claims: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            max_narration_chars: 300,
            planning_phrases: Regex::new(planning_phrases)?,
            concrete_markers: concrete_markers
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<Vec<_>, _>>()?,
            fake_call: Regex::new(fake_call)?,
            completion_claims: Regex::new(completion_claims)?,
        })
    }

    /// Override the length above which text is never treated as planning.
    pub fn with_max_narration_chars(mut self, chars: usize) -> Self {
        self.max_narration_chars = chars;
        self
    }

    /// Run the heuristics over one iteration's text output.
    ///
    /// `session_tool_calls` is the number of tool calls made so far in the
    /// whole session; the hallucinated-completion check only applies when
    /// it is zero.
    pub fn detect(&self, text: &str, session_tool_calls: u32) -> Option<NarrationFinding> {
        if self.fake_call.is_match(text) {
            return Some(NarrationFinding::FakeToolCall);
        }

        if session_tool_calls == 0 && self.completion_claims.is_match(text) {
            return Some(NarrationFinding::HallucinatedCompletion);
        }

        if text.chars().count() < self.max_narration_chars
            && self.planning_phrases.is_match(text)
            && !self.concrete_markers.iter().any(|re| re.is_match(text))
        {
            return Some(NarrationFinding::PlanningNarration);
        }

        None
    }
}
