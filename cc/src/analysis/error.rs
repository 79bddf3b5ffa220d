//! Error types for the analysis chains

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The model answered twice without producing the expected JSON
    #[error("model output could not be parsed after feedback retry: {0}")]
    MalformedOutput(String),

    /// The reply was cut off at the token limit before the JSON closed
    #[error("model output was truncated at the token limit (requested {max_tokens}); check llm.max-tokens")]
    Truncated { max_tokens: u32 },

    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("prompt rendering failed: {0}")]
    Prompt(String),

    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalysisError {
    pub fn is_malformed_output(&self) -> bool {
        matches!(self, Self::MalformedOutput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = AnalysisError::MalformedOutput("expected value at line 1".to_string());
        assert!(err.to_string().contains("after feedback retry"));
        assert!(err.is_malformed_output());

        let err = AnalysisError::from(LlmError::InvalidResponse("empty".to_string()));
        assert!(err.to_string().starts_with("LLM request failed"));
        assert!(!err.is_malformed_output());

        let err = AnalysisError::Truncated { max_tokens: 4096 };
        assert!(err.to_string().contains("truncated at the token limit (requested 4096)"));
    }
}
