//! # KPI Report
//!
//! Turns an extracted `ResultTable` into what is shown to the user: a display
//! table with formatted values, the channel with the best total gross margin,
//! per-row highlight flags and the revenue-versus-margin chart series.
//!
//! Formatting never fails. A missing value is shown as `N/D`, a missing margin
//! never wins and never highlights a row.
use crate::error::KpiError;
use crate::extractor::ChannelRecord;
use crate::extractor::ResultTable;
use crate::extractor::CHANNEL_FIELD;
use crate::layout::Kpi;
use crate::layout::Unit;
use serde::Serialize;
use std::fmt::Display;

/// Placeholder for a missing value.
pub const MISSING: &str = "N/D";

pub const CHART_TITLE: &str = "Ricavo Totale vs. Margine Lordo Totale per Canale";

/// KPIs plotted per channel, in series order.
pub const CHART_KPIS: [Kpi; 2] = [Kpi::TotalRevenue, Kpi::TotalGrossMargin];

/// `€ 1,234.50`, with thousands separators and two decimals.
pub fn format_currency(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("€ {}", group_thousands(value, 2)),
        None => MISSING.to_owned(),
    }
}

/// A fraction shown as a percentage: `0.18` -> `18.00%`.
pub fn format_percentage(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{:.2}%", value * 100.0),
        None => MISSING.to_owned(),
    }
}

pub fn format_count(value: Option<f64>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => MISSING.to_owned(),
    }
}

/// Formats a value according to the unit of its KPI.
pub fn format_value(kpi: Kpi, value: Option<f64>) -> String {
    match kpi.unit() {
        Unit::Currency => format_currency(value),
        Unit::Percentage => format_percentage(value),
        Unit::Count => format_count(value),
    }
}

fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value);
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(unsigned) => ("-", unsigned),
        None => ("", formatted.as_str()),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(formatted.len() + integer.len() / 3);
    grouped.push_str(sign);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}

/// Channel with the highest total gross margin.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BestChannel {
    pub channel: String,
    pub margin: f64,
}

/// Picks the record with the highest total gross margin, skipping missing margins.
///
/// Ties go to the first record in table order.
///
/// # Errors
///
/// `EmptyResultError` when the table is empty or no record has a margin.
pub fn best_channel(table: &ResultTable) -> Result<&ChannelRecord, KpiError> {
    max_margin(table).map(|(record, _)| record)
}

fn max_margin(table: &ResultTable) -> Result<(&ChannelRecord, f64), KpiError> {
    if table.is_empty() {
        return Err(KpiError::EmptyResultError("result table is empty".to_owned()));
    }

    let mut best: Option<(&ChannelRecord, f64)> = None;
    for record in table.iter() {
        if let Some(margin) = record.get(Kpi::TotalGrossMargin) {
            if best.map(|(_, best_margin)| margin > best_margin).unwrap_or(true) {
                best = Some((record, margin));
            }
        }
    }
    best.ok_or_else(|| KpiError::EmptyResultError(format!("no channel has a value for '{}'", Kpi::TotalGrossMargin)))
}

/// One flag per record, set on every record whose margin equals the maximum.
pub fn highlight_flags(table: &ResultTable) -> Vec<bool> {
    let max = table
        .iter()
        .filter_map(|record| record.get(Kpi::TotalGrossMargin))
        .fold(None, |max: Option<f64>, margin| match max {
            Some(max) if max >= margin => Some(max),
            _ => Some(margin),
        });

    table
        .iter()
        .map(|record| match (max, record.get(Kpi::TotalGrossMargin)) {
            (Some(max), Some(margin)) => margin == max,
            _ => false,
        })
        .collect()
}

/// Values of one KPI across channels; a missing value is a gap in the series.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Series {
    pub name: Kpi,
    pub values: Vec<Option<f64>>,
}

/// Grouped bar chart dataset: one category per channel, one series per plotted KPI.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartSeries {
    pub title: String,
    pub categories: Vec<String>,
    pub series: Vec<Series>,
}

pub fn chart_series(table: &ResultTable) -> ChartSeries {
    ChartSeries {
        title: CHART_TITLE.to_owned(),
        categories: table.iter().map(|record| record.channel.to_owned()).collect(),
        series: CHART_KPIS
            .iter()
            .map(|kpi| Series {
                name: *kpi,
                values: table.iter().map(|record| record.get(*kpi)).collect(),
            })
            .collect(),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisplayRow {
    pub channel: String,
    pub cells: Vec<String>,
    pub highlighted: bool,
}

/// Result table with every value formatted for display.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisplayTable {
    pub headers: Vec<String>,
    pub rows: Vec<DisplayRow>,
}

impl DisplayTable {
    pub fn new(table: &ResultTable) -> Self {
        let flags = highlight_flags(table);
        let kpis: Vec<Kpi> = table.records().first().map(|record| record.kpis().collect()).unwrap_or_default();

        let mut headers = Vec::with_capacity(kpis.len() + 1);
        headers.push(CHANNEL_FIELD.to_owned());
        headers.extend(kpis.iter().map(|kpi| kpi.label().to_owned()));

        let rows = table
            .iter()
            .zip(flags)
            .map(|(record, highlighted)| DisplayRow {
                channel: record.channel.to_owned(),
                cells: record
                    .values()
                    .iter()
                    .map(|(kpi, value)| format_value(*kpi, *value))
                    .collect(),
                highlighted,
            })
            .collect();

        Self { headers, rows }
    }
}

/// Renders an aligned text table; highlighted rows are marked with `*`.
impl Display for DisplayTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut widths: Vec<usize> = self.headers.iter().map(|header| header.chars().count()).collect();
        for row in &self.rows {
            let cells = std::iter::once(&row.channel).chain(row.cells.iter());
            for (width, cell) in widths.iter_mut().zip(cells) {
                *width = (*width).max(cell.chars().count());
            }
        }

        write_line(f, "  ", self.headers.iter(), &widths)?;
        let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
        write_line(f, "  ", rule.iter(), &widths)?;
        for row in &self.rows {
            let marker = if row.highlighted { "* " } else { "  " };
            write_line(f, marker, std::iter::once(&row.channel).chain(row.cells.iter()), &widths)?;
        }
        Ok(())
    }
}

fn write_line<'a>(
    f: &mut std::fmt::Formatter<'_>,
    marker: &str,
    cells: impl Iterator<Item = &'a String>,
    widths: &[usize],
) -> std::fmt::Result {
    f.write_str(marker)?;
    for (index, (cell, &width)) in cells.zip(widths).enumerate() {
        if index > 0 {
            f.write_str(" | ")?;
        }
        // `{:width$}` pads by chars, so `€` counts once
        if index == 0 {
            write!(f, "{cell:<width$}")?;
        } else {
            write!(f, "{cell:>width$}")?;
        }
    }
    writeln!(f)
}

/// Everything rendered for one upload.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub table: ResultTable,
    pub display_table: DisplayTable,
    pub best_channel: BestChannel,
    pub chart: ChartSeries,
}

impl Summary {
    /// Sentence naming the best channel and its margin.
    pub fn headline(&self) -> String {
        format!(
            "Il canale con il miglior margine lordo totale è {} con un margine di € {:.2}.",
            self.best_channel.channel, self.best_channel.margin
        )
    }
}

/// Builds the full report of an extracted table.
///
/// # Errors
///
/// `EmptyResultError` when there is no margin to rank.
pub fn summarize(table: ResultTable) -> Result<Summary, KpiError> {
    let (record, margin) = max_margin(&table)?;
    let best_channel = BestChannel {
        channel: record.channel.to_owned(),
        margin,
    };
    log::info!(
        "Best channel by total gross margin: '{}' ({})",
        best_channel.channel,
        format_currency(Some(best_channel.margin))
    );

    Ok(Summary {
        display_table: DisplayTable::new(&table),
        chart: chart_series(&table),
        best_channel,
        table,
    })
}
