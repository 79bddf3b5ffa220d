//! Structured contract terms as produced by the extraction chain

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A contract broken down into definitions, sections and terms
///
/// `title`, `definitions` and `sections` are all required when parsing model
/// output; a missing one is a malformed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub title: String,
    pub definitions: BTreeMap<String, String>,
    pub sections: Vec<Section>,
}

/// A numbered section, possibly nested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub terms: Vec<Term>,
    pub subsections: Vec<Section>,
}

/// A single clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub title: String,
    pub content: String,
}

impl Contract {
    /// Total number of terms across all sections and subsections
    pub fn term_count(&self) -> usize {
        self.sections.iter().map(Section::term_count).sum()
    }
}

impl Section {
    fn term_count(&self) -> usize {
        self.terms.len() + self.subsections.iter().map(Section::term_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
      "title": "Employment Contract between TechCorp and John Smith",
      "definitions": {"Agreement": "This Employment Contract."},
      "sections": [
        {
          "title": "1. Employment Terms",
          "terms": [{"title": "1.1 Position", "content": "Software Engineer."}],
          "subsections": [
            {
              "title": "1.2 Travel",
              "terms": [
                {"title": "1.2.1 Cap", "content": "Trips must not exceed $3,000."},
                {"title": "1.2.2 Approval", "content": "Offshore trips need approval."}
              ],
              "subsections": []
            }
          ]
        }
      ]
    }"#;

    #[test]
    fn test_parse_nested_contract() {
        let contract: Contract = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(contract.definitions.len(), 1);
        assert_eq!(contract.sections[0].subsections[0].terms.len(), 2);
        assert_eq!(contract.term_count(), 3);
    }

    #[test]
    fn test_missing_top_level_property_rejected() {
        let result = serde_json::from_str::<Contract>(r#"{"title": "x", "sections": []}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_term_missing_content_rejected() {
        let json = r#"{"title": "x", "definitions": {}, "sections": [
            {"title": "1", "terms": [{"title": "1.1"}], "subsections": []}
        ]}"#;
        assert!(serde_json::from_str::<Contract>(json).is_err());
    }
}
