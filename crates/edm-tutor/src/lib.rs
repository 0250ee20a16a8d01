//! AI tutor boundary.
//!
//! [`LlmClient`] is the provider seam; [`AzureOpenAi`] is the only live
//! implementation. [`Tutor`] wraps an optional client and falls back to the
//! deterministic mock tutor whenever the client is absent or fails, so the
//! HTTP layer never sees an LLM error.

use async_trait::async_trait;

mod azure;
mod chat;
mod mock;
mod tutor;

pub use azure::{AzureOpenAi, AzureSettings};
pub use chat::{chat_reply, detect_subject, ChatReply, Subject};
pub use mock::{
    mock_explanation, mock_learning_path, mock_questions, GeneratedQuestion, PathModule, PathPlan,
};
pub use tutor::{Explanation, Features, LearningPath, QuestionSet, Tutor, TutorStatus};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TutorError {
    /// Network or transport failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// The upstream API answered with a non-success status.
    #[error("llm api error code={code}: {message}")]
    Api { code: u16, message: String },
    /// The response payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// Missing or invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl TutorError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TutorError::Api { code: 429, .. })
    }
}

// ---------------------------------------------------------------------------
// Client trait
// ---------------------------------------------------------------------------

/// One system + user exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Hosted chat-completion provider.
///
/// Object safe so the daemon can hold an `Arc<dyn LlmClient>`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Human-readable provider name (e.g. `"Azure OpenAI"`).
    fn name(&self) -> &'static str;

    /// Returns the assistant message text.
    async fn complete(&self, req: ChatRequest) -> Result<String, TutorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_detected_by_status() {
        let e = TutorError::Api {
            code: 429,
            message: "slow down".into(),
        };
        assert!(e.is_rate_limited());
        assert_eq!(e.to_string(), "llm api error code=429: slow down");
        assert!(!TutorError::Transport("reset".into()).is_rate_limited());
    }
}
