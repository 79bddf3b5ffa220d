//! Contract term extraction chain

use std::sync::Arc;

use tracing::{debug, info};

use super::AnalysisError;
use super::feedback::complete_json;
use crate::domain::Contract;
use crate::llm::{CompletionRequest, LlmClient, Message};
use crate::prompts::{ExtractionContext, PromptLoader, embedded};

/// Tokens requested per extraction; a long contract's terms run this large
pub(crate) const EXTRACTION_MAX_TOKENS: u32 = 16_384;

/// Turns raw contract text into a structured [`Contract`]
#[derive(Clone)]
pub struct ContractExtractor {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
}

impl ContractExtractor {
    pub fn new(client: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>) -> Self {
        debug!("ContractExtractor::new: called");
        Self { client, prompts }
    }

    /// Extract definitions, sections and terms from `contract_text`
    pub async fn extract(&self, contract_text: &str) -> Result<Contract, AnalysisError> {
        debug!(text_len = contract_text.len(), "ContractExtractor::extract: called");
        let prompt = self
            .prompts
            .extraction_prompt(&ExtractionContext {
                contract_text: contract_text.to_string(),
            })
            .map_err(|e| AnalysisError::Prompt(e.to_string()))?;

        let request = CompletionRequest {
            system_prompt: embedded::EXTRACTION_SYSTEM.to_string(),
            messages: vec![Message::user(prompt)],
            max_tokens: EXTRACTION_MAX_TOKENS,
            temperature: None,
        };

        let contract: Contract = complete_json(self.client.as_ref(), request).await?;
        info!(
            title = %contract.title,
            sections = contract.sections.len(),
            terms = contract.term_count(),
            "Extracted contract"
        );
        Ok(contract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;

    const CONTRACT_JSON: &str = r#"{
      "title": "Consulting Agreement",
      "definitions": {"Consultant": "Acme Ltd."},
      "sections": [
        {"title": "1. Travel", "terms": [{"title": "1.1 Cap", "content": "Trips must not exceed $3,000."}], "subsections": []}
      ]
    }"#;

    fn extractor(client: Arc<MockLlmClient>) -> ContractExtractor {
        ContractExtractor::new(client, Arc::new(PromptLoader::embedded_only()))
    }

    #[tokio::test]
    async fn test_extract_success() {
        let client = Arc::new(MockLlmClient::texts(&[CONTRACT_JSON]));
        let contract = extractor(client.clone()).extract("The consultant travels.").await.unwrap();

        assert_eq!(contract.title, "Consulting Agreement");
        assert_eq!(contract.term_count(), 1);

        let request = &client.requests()[0];
        assert_eq!(request.system_prompt, embedded::EXTRACTION_SYSTEM);
        assert!(request.messages[0].content.contains("The consultant travels."));
    }

    #[tokio::test]
    async fn test_extract_recovers_after_one_retry() {
        let client = Arc::new(MockLlmClient::texts(&["I cannot format this.", CONTRACT_JSON]));
        let contract = extractor(client.clone()).extract("text").await.unwrap();
        assert_eq!(contract.sections.len(), 1);
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_extract_missing_required_property_is_malformed() {
        let partial = r#"{"title": "No sections", "definitions": {}}"#;
        let client = Arc::new(MockLlmClient::texts(&[partial, partial]));
        let err = extractor(client).extract("text").await.unwrap_err();
        assert!(err.is_malformed_output());
    }
}
