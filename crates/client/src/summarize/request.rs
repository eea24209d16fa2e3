//! Chat-completions request types and prompt composition.

use litmark_core::Highlight;
use serde::Serialize;

/// System prompt sent with every summarization request.
const SYSTEM_PROMPT: &str = "You are a concise summarizer. Summarize the highlighted passage \
                             in two or three sentences, in the language of the passage. \
                             Do not add opinions or information not present in the text.";

/// One chat message on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Request body for the chat-completions endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl ChatRequest {
    /// Build the request for one highlight.
    ///
    /// The user message carries the selected text plus the page
    /// metadata the model can use for framing.
    pub fn for_highlight(highlight: &Highlight, model: &str, max_tokens: u32, temperature: f64) -> Self {
        let mut user = format!("Highlighted text:\n{}", highlight.text);
        if !highlight.title.is_empty() {
            user.push_str(&format!("\n\nPage title: {}", highlight.title));
        }
        user.push_str(&format!("\nPage URL: {}", highlight.url));

        Self {
            model: model.to_string(),
            messages: vec![
                ChatMessage { role: "system".into(), content: SYSTEM_PROMPT.into() },
                ChatMessage { role: "user".into(), content: user },
            ],
            max_tokens,
            temperature,
        }
    }
}
