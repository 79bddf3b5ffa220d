//! Completion with one round of corrective feedback

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{AnalysisError, extract_json_from_text};
use crate::llm::{CompletionRequest, CompletionResponse, LlmClient, Message, StopReason};

const NOT_JSON: &str = "The output is not valid JSON. Ensure you provide the JSON as specified, and nothing else.";
const WRONG_STRUCTURE: &str = "The JSON structure is incorrect. Ensure it matches the required format.";

/// Why a reply was rejected
#[derive(Debug)]
enum Rejection {
    NotJson(serde_json::Error),
    WrongStructure(serde_json::Error),
}

impl Rejection {
    /// Corrective message sent back to the model
    fn observation(&self) -> &'static str {
        match self {
            Self::NotJson(_) => NOT_JSON,
            Self::WrongStructure(_) => WRONG_STRUCTURE,
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::NotJson(e) => format!("not valid JSON: {}", e),
            Self::WrongStructure(e) => format!("unexpected JSON structure: {}", e),
        }
    }
}

fn parse_reply<T: DeserializeOwned>(reply: &str) -> Result<T, Rejection> {
    let value: serde_json::Value = serde_json::from_str(extract_json_from_text(reply)).map_err(Rejection::NotJson)?;
    serde_json::from_value(value).map_err(Rejection::WrongStructure)
}

/// Parse a reply, telling a cut-off reply apart from a malformed one
fn accept<T: DeserializeOwned>(
    response: CompletionResponse,
    max_tokens: u32,
) -> Result<Result<T, Rejection>, AnalysisError> {
    debug!(
        input_tokens = response.usage.input_tokens,
        output_tokens = response.usage.output_tokens,
        stop_reason = ?response.stop_reason,
        "accept: called"
    );
    let truncated = response.stop_reason == StopReason::MaxTokens;
    match parse_reply(&response.content.unwrap_or_default()) {
        Err(rejection) if truncated => {
            warn!(max_tokens, reason = %rejection.detail(), "accept: reply hit the token limit");
            Err(AnalysisError::Truncated { max_tokens })
        }
        parsed => Ok(parsed),
    }
}

/// Ask the model for a `T`, retrying once with feedback
///
/// When the first reply does not parse, the bad reply is replayed as an
/// assistant turn followed by a user turn describing the problem, and the
/// model is asked again. A second failure is [`AnalysisError::MalformedOutput`].
/// A reply that fails to parse because it ran into the token limit is
/// [`AnalysisError::Truncated`] straight away, with no feedback turn.
/// Transport errors are returned as-is; the client already retried them.
pub(crate) async fn complete_json<T: DeserializeOwned>(
    client: &dyn LlmClient,
    mut request: CompletionRequest,
) -> Result<T, AnalysisError> {
    debug!(message_count = request.messages.len(), "complete_json: called");
    let max_tokens = request.max_tokens;
    let response = client.complete(request.clone()).await?;
    let reply = response.content.clone().unwrap_or_default();

    let rejection = match accept(response, max_tokens)? {
        Ok(value) => return Ok(value),
        Err(rejection) => rejection,
    };

    warn!(reason = %rejection.detail(), "complete_json: malformed reply, asking the model to correct it");
    request.messages.push(Message::assistant(reply));
    request.messages.push(Message::user(rejection.observation()));

    let retry = client.complete(request).await?;
    accept(retry, max_tokens)?.map_err(|rejection| {
        warn!(reason = %rejection.detail(), "complete_json: still malformed after feedback");
        AnalysisError::MalformedOutput(rejection.detail())
    })
}
