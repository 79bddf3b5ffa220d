//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent
///
/// No conversation state is kept between calls; a caller that wants the
/// model to see earlier turns (the malformed-output feedback exchange)
/// puts them in the request's messages.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request and wait for the full response
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
