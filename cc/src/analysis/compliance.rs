//! Task compliance analysis chain

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::AnalysisError;
use super::feedback::complete_json;
use crate::domain::{Contract, Task, TaskAnalysis};
use crate::llm::{CompletionRequest, LlmClient, Message};
use crate::prompts::{ComplianceContext, PromptLoader, embedded};

/// Upper bound requested per verdict; the client caps it further
const COMPLIANCE_MAX_TOKENS: u32 = 4096;

/// Judges tasks against an extracted contract
#[derive(Clone)]
pub struct ComplianceAnalyzer {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
}

impl ComplianceAnalyzer {
    pub fn new(client: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>) -> Self {
        debug!("ComplianceAnalyzer::new: called");
        Self { client, prompts }
    }

    /// Analyze a single task
    ///
    /// The verdict always describes `task` as given: the model's echo of the
    /// description and cost is replaced by the input values.
    pub async fn analyze_task(&self, contract: &Contract, task: &Task) -> Result<TaskAnalysis, AnalysisError> {
        debug!(%task.task_description, %task.task_cost, "ComplianceAnalyzer::analyze_task: called");
        let prompt = self
            .prompts
            .compliance_prompt(&ComplianceContext {
                contract_json: serde_json::to_string_pretty(contract)?,
                task_description: task.task_description.clone(),
                task_cost: task.task_cost,
            })
            .map_err(|e| AnalysisError::Prompt(e.to_string()))?;

        let request = CompletionRequest {
            system_prompt: embedded::COMPLIANCE_SYSTEM.to_string(),
            messages: vec![Message::user(prompt)],
            max_tokens: COMPLIANCE_MAX_TOKENS,
            temperature: None,
        };

        let mut verdict: TaskAnalysis = complete_json(self.client.as_ref(), request).await?;
        verdict.task_description = task.task_description.clone();
        verdict.task_cost = task.task_cost;
        Ok(verdict)
    }

    /// Analyze every task concurrently
    ///
    /// Returns one verdict per task, in input order. A task whose analysis
    /// fails gets a stand-in verdict (non-compliant, ambiguous) and the rest
    /// of the batch is unaffected.
    pub async fn analyze_all(&self, contract: &Contract, tasks: &[Task]) -> Vec<TaskAnalysis> {
        debug!(task_count = tasks.len(), "ComplianceAnalyzer::analyze_all: called");
        let verdicts = join_all(tasks.iter().map(|task| async move {
            match self.analyze_task(contract, task).await {
                Ok(verdict) => verdict,
                Err(e) => {
                    warn!(task = %task.task_description, error = %e, "Task analysis failed");
                    TaskAnalysis::unanalyzed(task, e)
                }
            }
        }))
        .await;

        let compliant = verdicts.iter().filter(|v| v.compliance).count();
        info!(tasks = verdicts.len(), compliant, "Analyzed task batch");
        verdicts
    }
}
