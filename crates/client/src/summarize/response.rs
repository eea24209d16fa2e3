//! Chat-completions response parsing.
//!
//! Any deviation from the expected shape is a hard failure; a response
//! is never partially parsed.

use serde::Deserialize;

use super::error::SummarizeError;

/// Response body from the chat-completions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Extract the summary text: first choice, trimmed, non-empty.
    ///
    /// # Errors
    ///
    /// `MalformedResponse` when no choice or content is present,
    /// `EmptySummary` when the content trims to nothing.
    pub fn into_summary(self) -> Result<String, SummarizeError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SummarizeError::MalformedResponse("no choices in response".into()))?;
        let content = choice
            .message
            .content
            .ok_or_else(|| SummarizeError::MalformedResponse("choice carries no content".into()))?;
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(SummarizeError::EmptySummary);
        }
        Ok(trimmed.to_string())
    }
}
