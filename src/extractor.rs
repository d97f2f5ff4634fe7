//! # KPI Extraction
//!
//! Reads the KPI grid of the `CALCOLO` worksheet into one `ChannelRecord` per
//! delivery channel. Every record carries every KPI of the layout: a cell that
//! is empty, outside the sheet or not a number is kept as a missing value
//! rather than dropped, so all records share the same field set.
use crate::error::KpiError;
use crate::layout::Kpi;
use crate::layout::Layout;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::to_zero_based_row;
use crate::spreadsheet::Sheet;
use crate::spreadsheet::Workbook;
use serde::ser::SerializeMap;
use serde::Serialize;
use serde::Serializer;

/// Name of the identifying field of a record in every tabular output.
pub const CHANNEL_FIELD: &str = "Channel";

/// KPI values of one delivery channel, in layout order.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelRecord {
    pub channel: String,
    values: Vec<(Kpi, Option<f64>)>,
}

impl ChannelRecord {
    pub fn new(channel: &str, values: Vec<(Kpi, Option<f64>)>) -> Self {
        Self {
            channel: channel.to_owned(),
            values,
        }
    }

    /// Value of a KPI, `None` when the cell was missing or the KPI is not part of the layout.
    pub fn get(&self, kpi: Kpi) -> Option<f64> {
        self.values
            .iter()
            .find(|(other, _)| *other == kpi)
            .and_then(|(_, value)| *value)
    }

    /// All (KPI, value) fields, missing values included.
    pub fn values(&self) -> &[(Kpi, Option<f64>)] {
        &self.values
    }

    pub fn kpis(&self) -> impl Iterator<Item = Kpi> + '_ {
        self.values.iter().map(|(kpi, _)| *kpi)
    }
}

/// Serializes as `{"Channel": ..., "<KPI label>": number | null, ...}` keeping field order.
impl Serialize for ChannelRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry(CHANNEL_FIELD, &self.channel)?;
        for (kpi, value) in &self.values {
            map.serialize_entry(kpi.label(), value)?;
        }
        map.end()
    }
}

/// Channel records in layout channel order. Built once per upload and never mutated.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultTable {
    records: Vec<ChannelRecord>,
}

impl ResultTable {
    pub fn new(records: Vec<ChannelRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ChannelRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelRecord> {
        self.records.iter()
    }

    pub fn get(&self, channel: &str) -> Option<&ChannelRecord> {
        self.records.iter().find(|record| record.channel == channel)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Pulls the KPIs of a `Layout` out of a workbook or an already loaded sheet.
#[derive(Clone, Debug, Default)]
pub struct Extractor {
    layout: Layout,
}

impl Extractor {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// Extracts from the bytes of an uploaded workbook.
    ///
    /// # Errors
    ///
    /// - `ParseError` if the bytes are not a readable workbook
    /// - `SheetNotFoundError` if the layout sheet does not exist
    /// - `ConfigError` if a channel has no column
    pub fn extract(&self, bytes: &[u8]) -> Result<Option<ResultTable>, KpiError> {
        let mut workbook = Workbook::from_bytes(bytes.to_vec())?;
        self.extract_workbook(&mut workbook)
    }

    /// Extracts from an opened workbook.
    pub fn extract_workbook(&self, workbook: &mut Workbook) -> Result<Option<ResultTable>, KpiError> {
        let sheet = workbook
            .worksheet(&self.layout.sheet_name)?
            .ok_or_else(|| KpiError::SheetNotFoundError(self.layout.sheet_name.to_owned()))?;
        self.extract_sheet(&sheet)
    }

    /// Extracts from a loaded sheet grid.
    ///
    /// Returns `Ok(None)` when no record was produced, which only happens with
    /// a layout that lists no channels.
    pub fn extract_sheet(&self, sheet: &Sheet) -> Result<Option<ResultTable>, KpiError> {
        let mut records = Vec::<ChannelRecord>::with_capacity(self.layout.channels.len());
        for channel in &self.layout.channels {
            let col = self
                .layout
                .channel_columns
                .column(channel)
                .ok_or_else(|| KpiError::ConfigError(format!("Channel '{channel}' has no column")))?;

            let mut values = Vec::<(Kpi, Option<f64>)>::with_capacity(self.layout.kpi_rows.len());
            for (kpi, row_number) in self.layout.kpi_rows.iter() {
                let row = to_zero_based_row(row_number)
                    .ok_or_else(|| KpiError::ConfigError(format!("KPI '{kpi}' mapped to row {row_number}")))?;
                let value = sheet.number(row, col);
                if value.is_none() {
                    match sheet.get(row, col) {
                        Some(cell) => log::warn!(
                            "'{kpi}' of '{channel}' at {} is not a number: '{cell}'",
                            cell.reference()
                        ),
                        None => log::warn!(
                            "'{kpi}' of '{channel}' at {} is empty",
                            index_to_reference(row, col)
                        ),
                    }
                }
                values.push((kpi, value));
            }
            log::debug!("Extracted channel '{channel}' from column {}", col);
            records.push(ChannelRecord::new(channel, values));
        }

        if records.is_empty() {
            log::warn!("No channel records extracted from sheet '{}'", sheet.name);
            Ok(None)
        } else {
            Ok(Some(ResultTable::new(records)))
        }
    }
}
