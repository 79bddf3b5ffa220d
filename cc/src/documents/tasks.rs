//! Task list reading

use std::io::Cursor;

use calamine::{Reader, Xlsx, open_workbook_from_rs};
use tracing::debug;

use super::{DocumentError, extension};
use crate::domain::Task;

/// Header of the column holding the task description
pub const DESCRIPTION_COLUMN: &str = "Task Description";

/// Header of the column holding the task cost
pub const AMOUNT_COLUMN: &str = "Amount";

/// Supported task list upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFormat {
    Csv,
    Xlsx,
}

impl TaskFormat {
    pub fn from_filename(filename: &str) -> Result<Self, DocumentError> {
        debug!(%filename, "TaskFormat::from_filename: called");
        match extension(filename).as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("xlsx") => Ok(Self::Xlsx),
            _ => Err(DocumentError::UnsupportedFormat {
                filename: filename.to_string(),
                expected: ".csv or .xlsx",
            }),
        }
    }
}

/// Read the task list from an uploaded spreadsheet
///
/// The first row is the header. Blank rows are skipped; any other row must
/// have a description and a numeric amount. Row numbers in errors count
/// the header as row 1.
pub fn read_tasks(filename: &str, bytes: &[u8]) -> Result<Vec<Task>, DocumentError> {
    debug!(%filename, size = bytes.len(), "read_tasks: called");
    let rows = match TaskFormat::from_filename(filename)? {
        TaskFormat::Csv => csv_rows(bytes)?,
        TaskFormat::Xlsx => xlsx_rows(bytes)?,
    };

    let mut rows = rows.into_iter();
    let header = rows.next().unwrap_or_default();
    let description_idx = column_index(&header, DESCRIPTION_COLUMN)?;
    let amount_idx = column_index(&header, AMOUNT_COLUMN)?;

    let mut tasks = Vec::new();
    for (offset, row) in rows.enumerate() {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let row_number = offset + 2;
        let cell = |idx: usize| row.get(idx).map(|c| c.trim()).unwrap_or("");

        let description = cell(description_idx);
        if description.is_empty() {
            return Err(DocumentError::EmptyDescription { row: row_number });
        }
        let amount = cell(amount_idx);
        let cost = parse_amount(amount).ok_or_else(|| DocumentError::InvalidAmount {
            row: row_number,
            value: amount.to_string(),
        })?;
        tasks.push(Task::new(description, cost));
    }

    debug!(task_count = tasks.len(), "read_tasks: parsed");
    Ok(tasks)
}

/// Parse a money amount such as `$1,200.50`
///
/// Dollar signs and thousands separators are ignored.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != '$' && *c != ',').collect();
    cleaned.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn column_index(header: &[String], name: &'static str) -> Result<usize, DocumentError> {
    header
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
        .ok_or(DocumentError::MissingColumn(name))
}

fn csv_rows(bytes: &[u8]) -> Result<Vec<Vec<String>>, DocumentError> {
    debug!("csv_rows: called");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

fn xlsx_rows(bytes: &[u8]) -> Result<Vec<Vec<String>>, DocumentError> {
    debug!("xlsx_rows: called");
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DocumentError::Spreadsheet("workbook has no sheets".to_string()))??;

    Ok(range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect())
}
