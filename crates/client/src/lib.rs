//! Client code for litmark.
//!
//! This crate provides the outbound summarization HTTP client and the
//! sliding-window admission control used by the service gateway.

pub mod ratelimit;
pub mod summarize;

pub use ratelimit::SlidingWindowLimiter;
pub use summarize::{
    ChatMessage, ChatRequest, ChatResponse, SummarizeClient, SummarizeConfig, SummarizeError, SummaryBackend,
};
