//! Document readers
//!
//! Turn uploaded bytes into the inputs the analysis chains work on: plain
//! contract text from `.docx`/`.txt`, and a [`Task`](crate::domain::Task)
//! list from `.csv`/`.xlsx` with `Task Description` and `Amount` columns.
//! The format is chosen from the file name's extension.

mod contract;
mod error;
mod tasks;

pub use contract::{ContractFormat, read_contract_text};
pub use error::DocumentError;
pub use tasks::{AMOUNT_COLUMN, DESCRIPTION_COLUMN, TaskFormat, parse_amount, read_tasks};

/// Lowercased extension of `filename`, without the dot
fn extension(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}
