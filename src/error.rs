use crate::spreadsheet::SpreadsheetError;
use thiserror::Error;

/// Errors of the KPI extraction and report pipeline.
///
/// Every variant ends the current run; a missing KPI cell is not an error.
#[derive(Error, Debug)]
pub enum KpiError {
    /// The upload is not a readable workbook (corrupt, wrong format, broken container)
    #[error("Parse spreadsheet failed: {0}")]
    ParseError(#[from] SpreadsheetError),

    #[error("Sheet '{0}' not found in workbook")]
    SheetNotFoundError(String),

    /// The layout itself is inconsistent
    #[error("Invalid layout configuration: {0}")]
    ConfigError(String),

    #[error("No data to report: {0}")]
    EmptyResultError(String),
}
