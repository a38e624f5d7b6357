//! History compaction collaborator.

use async_trait::async_trait;
use warden_core::error::SessionError;
use warden_core::message::Message;

/// The outcome of a compaction call: the summary text plus the replacement
/// history (summary turn followed by the most recent turns).
#[derive(Debug, Clone)]
pub struct CompactionResult {
    pub summary: String,
    pub messages: Vec<Message>,
}

/// External summarization collaborator, invoked when reported prompt tokens
/// exceed the configured compaction threshold. The controller swaps the
/// whole history for the returned messages and clears its tool-output
/// markers in the same operation.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        model: &str,
        history: &[Message],
    ) -> Result<CompactionResult, SessionError>;
}
