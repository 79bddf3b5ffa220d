//! Analysis chains
//!
//! Two single-shot LLM chains built on the same pattern: render a prompt,
//! ask the model for JSON, parse it into a typed value, and on malformed
//! output give the model exactly one chance to correct itself.
//!
//! - [`ContractExtractor`]: contract text -> [`Contract`](crate::domain::Contract)
//! - [`ComplianceAnalyzer`]: contract + task -> [`TaskAnalysis`](crate::domain::TaskAnalysis),
//!   fanned out over a whole task list

mod compliance;
mod error;
mod extraction;
mod feedback;
mod json;

pub use compliance::ComplianceAnalyzer;
pub use error::AnalysisError;
pub use extraction::ContractExtractor;
pub(crate) use extraction::EXTRACTION_MAX_TOKENS;
pub use json::extract_json_from_text;
