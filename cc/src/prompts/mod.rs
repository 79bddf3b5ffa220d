//! Prompt Template System
//!
//! Loads and renders the `.pmt` templates the analysis chains send to the model.
//!
//! Template loading chain:
//! 1. `{prompts.dir}/{name}.pmt` (configured override)
//! 2. `.contractcheck/prompts/{name}.pmt` (project override)
//! 3. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{ComplianceContext, ExtractionContext, PromptLoader};
