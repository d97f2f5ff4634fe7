//! # Delivery Channel KPI Report
//!
//! Reads the `CALCOLO` worksheet of a delivery margin workbook (`.xlsx`) and
//! reports, for each delivery channel, the nine economic KPIs the sheet
//! computes. The channel with the best total gross margin is picked out and
//! highlighted, and total revenue is set against total gross margin in a chart
//! dataset.
//!
//! ## Pipeline
//!
//! - `extractor`: workbook bytes -> `ResultTable`, one record per channel
//! - `report`: `ResultTable` -> `Summary` (formatted table, best channel, chart)
//!
//! Cells that are empty or not numeric become missing values shown as `N/D`;
//! they never abort a run.
//!
//! ```no_run
//! let bytes = std::fs::read("margini_delivery.xlsx")?;
//! let summary = delivery_kpi::analyze(&bytes)?;
//! println!("{}", summary.display_table);
//! println!("{}", summary.headline());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
mod helpers;

pub mod error;
pub mod extractor;
pub mod layout;
pub mod report;
pub mod spreadsheet;

pub use crate::error::KpiError;
pub use crate::extractor::ChannelRecord;
pub use crate::extractor::Extractor;
pub use crate::extractor::ResultTable;
pub use crate::layout::Kpi;
pub use crate::layout::Layout;
pub use crate::report::Summary;
pub use crate::spreadsheet::Workbook;

/// Runs the full pipeline on workbook bytes with the default layout.
pub fn analyze(bytes: &[u8]) -> Result<Summary, KpiError> {
    analyze_with(Layout::default(), bytes)
}

/// Runs the full pipeline on workbook bytes with the given layout.
///
/// # Errors
///
/// Any `KpiError`; extraction without records is reported as `EmptyResultError`.
pub fn analyze_with(layout: Layout, bytes: &[u8]) -> Result<Summary, KpiError> {
    let mut workbook = Workbook::from_bytes(bytes.to_vec())?;
    analyze_workbook(layout, &mut workbook)
}

/// Runs the full pipeline on an opened workbook.
pub fn analyze_workbook(layout: Layout, workbook: &mut Workbook) -> Result<Summary, KpiError> {
    match Extractor::new(layout).extract_workbook(workbook)? {
        Some(table) => report::summarize(table),
        None => Err(KpiError::EmptyResultError("no channel records".to_owned())),
    }
}
