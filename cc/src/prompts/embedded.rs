//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Contract term extraction prompt
pub const EXTRACT_CONTRACT: &str = include_str!("../../prompts/extract-contract.pmt");

/// Task compliance analysis prompt
pub const ANALYZE_TASK: &str = include_str!("../../prompts/analyze-task.pmt");

/// System prompt for the extraction chain
pub const EXTRACTION_SYSTEM: &str = "You are an expert at extracting information from contracts and formatting it in JSON.";

/// System prompt for the compliance chain
pub const COMPLIANCE_SYSTEM: &str = "You are an expert at judging compliance of tasks to a contract.";

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "extract-contract" => Some(EXTRACT_CONTRACT),
        "analyze-task" => Some(ANALYZE_TASK),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_embedded_extract() {
        let prompt = get_embedded("extract-contract").unwrap();
        assert!(prompt.contains("{{contract_text}}"));
        assert!(prompt.contains("definitions"));
        assert!(prompt.contains("subsections"));
    }

    #[test]
    fn test_get_embedded_analyze() {
        let prompt = get_embedded("analyze-task").unwrap();
        assert!(prompt.contains("{{contract_json}}"));
        assert!(prompt.contains("{{task_description}}"));
        assert!(prompt.contains("{{task_cost}}"));
        assert!(prompt.contains("ambiguous"));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("unknown-template").is_none());
    }
}
