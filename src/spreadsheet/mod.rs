//! # Spreadsheet Reading Module
//!
//! Opens Office Open XML workbooks (`.xlsx`) from uploaded bytes or from disk and
//! loads single worksheets into a sparse `Sheet` grid addressed by 0-based
//! (row, column). Only what the KPI extraction needs is decoded: the sheet list,
//! shared strings, and cell values (cached results for formula cells).
use thiserror::Error;

pub mod cell;
pub mod reference;
pub mod sheet;
pub mod xlsx;

pub use cell::Cell;
pub use cell::CellType;
pub use sheet::Sheet;
pub use xlsx::Workbook;

/// Errors raised while opening or decoding a workbook container.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Workbook structure errors
    #[error("Missing '{0}' in workbook")]
    FileError(String),

    #[error("Shared string #{0} is not defined")]
    SharedStringIndexError(usize),
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, SpreadsheetError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| SpreadsheetError::WithContextError(format!("{}: {}", message, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_prefix_keeps_cause_text() {
        let result: Result<(), SpreadsheetError> = Err(SpreadsheetError::FileError("xl/workbook.xml".to_owned()));
        let error = result.with_prefix("Read sheet 'CALCOLO'").unwrap_err();
        assert_eq!(error.to_string(), "Read sheet 'CALCOLO': Missing 'xl/workbook.xml' in workbook");
    }

    #[test]
    fn with_prefix_leaves_ok_untouched() {
        let result: Result<u8, SpreadsheetError> = Ok(7);
        assert_eq!(result.with_prefix("unused").unwrap(), 7);
    }
}
