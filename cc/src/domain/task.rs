//! Tasks and their compliance verdicts

use serde::{Deserialize, Serialize};

use super::Term;

/// One line of the uploaded task list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_description: String,
    pub task_cost: f64,
}

impl Task {
    pub fn new(description: impl Into<String>, cost: f64) -> Self {
        Self {
            task_description: description.into(),
            task_cost: cost,
        }
    }
}

/// Compliance verdict for one task against one contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAnalysis {
    pub task_description: String,
    pub task_cost: f64,
    pub applicable_terms: Vec<Term>,
    pub reasoning: String,
    pub compliance: bool,
    pub ambiguous: bool,
}

impl TaskAnalysis {
    /// Stand-in verdict for a task whose analysis failed
    ///
    /// Marked non-compliant and ambiguous so it is flagged for human review.
    pub fn unanalyzed(task: &Task, reason: impl std::fmt::Display) -> Self {
        Self {
            task_description: task.task_description.clone(),
            task_cost: task.task_cost,
            applicable_terms: vec![],
            reasoning: format!("An error occurred while analyzing compliance: {}.", reason),
            compliance: false,
            ambiguous: true,
        }
    }
}
