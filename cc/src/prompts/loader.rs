//! Prompt Loader
//!
//! Loads prompt templates from override directories or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;

/// Variables for the `extract-contract` template
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionContext {
    /// Plain text of the uploaded contract
    pub contract_text: String,
}

/// Variables for the `analyze-task` template
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceContext {
    /// Extracted contract, serialized as pretty JSON
    pub contract_json: String,
    pub task_description: String,
    pub task_cost: f64,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// Override directories, searched in order
    dirs: Vec<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that searches `configured` (if any), then
    /// `.contractcheck/prompts/` under the working directory
    pub fn new(configured: Option<&Path>) -> Self {
        debug!(?configured, "PromptLoader::new: called");
        let candidates = configured
            .map(Path::to_path_buf)
            .into_iter()
            .chain(std::iter::once(PathBuf::from(".contractcheck/prompts")));

        let dirs: Vec<PathBuf> = candidates
            .filter(|dir| {
                let exists = dir.is_dir();
                debug!(?dir, %exists, "PromptLoader::new: checking directory");
                exists
            })
            .collect();

        Self { hbs: engine(), dirs }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: engine(),
            dirs: Vec::new(),
        }
    }

    /// Load a template by name, first match wins
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        for dir in &self.dirs {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
        }

        debug!("PromptLoader::load_template: trying embedded fallback");
        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        info!("Rendering template '{}'", template_name);

        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    pub fn extraction_prompt(&self, context: &ExtractionContext) -> Result<String> {
        debug!(contract_len = context.contract_text.len(), "PromptLoader::extraction_prompt: called");
        self.render("extract-contract", context)
    }

    pub fn compliance_prompt(&self, context: &ComplianceContext) -> Result<String> {
        debug!(%context.task_description, "PromptLoader::compliance_prompt: called");
        self.render("analyze-task", context)
    }
}

impl Default for PromptLoader {
    fn default() -> Self {
        Self::embedded_only()
    }
}

// Prompts carry raw contract text and JSON, so HTML escaping is off.
fn engine() -> Handlebars<'static> {
    let mut hbs = Handlebars::new();
    hbs.register_escape_fn(handlebars::no_escape);
    hbs
}
