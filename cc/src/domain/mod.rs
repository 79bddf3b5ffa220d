//! Domain types shared by the HTTP layer, the analysis chains and the CLI

mod contract;
mod task;

pub use contract::{Contract, Section, Term};
pub use task::{Task, TaskAnalysis};

/// Session key holding the extracted [`Contract`]
pub const CONTRACT_KEY: &str = "contract_json";

/// Session key holding the uploaded [`Task`] list
pub const TASKS_KEY: &str = "tasks";
