//! ContractCheck - contract compliance checker
//!
//! Users upload a contract and a list of tasks with costs; the contract's
//! terms are extracted by an LLM and every task is judged against them.
//! The web service keeps each visitor's uploads in a signed, time-limited
//! server-side session (see the `sessionstore` crate).
//!
//! # Modules
//!
//! - [`server`] - Axum service, session binder middleware and handlers
//! - [`analysis`] - Extraction and compliance chains with feedback retry
//! - [`documents`] - DOCX/TXT contract and CSV/XLSX task list readers
//! - [`llm`] - LLM client trait with OpenAI and Anthropic implementations
//! - [`prompts`] - Handlebars prompt templates
//! - [`domain`] - Contract, task and verdict types
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod analysis;
pub mod cli;
pub mod config;
pub mod documents;
pub mod domain;
pub mod llm;
pub mod prompts;
pub mod server;

pub use analysis::{AnalysisError, ComplianceAnalyzer, ContractExtractor};
pub use config::Config;
pub use domain::{Contract, Task, TaskAnalysis};
pub use server::{AppState, router};
