//! Fixed coordinates of the delivery KPIs inside the `CALCOLO` worksheet.
//!
//! A `Layout` tells the extractor which sheet to read, which visual row holds
//! each KPI and which column holds each delivery channel. It is a plain value
//! handed to the `Extractor`, so tests can build their own grids and layouts.
use crate::error::KpiError;
use crate::spreadsheet::reference::column_letter_to_index;
use serde::Serialize;
use std::fmt::Display;

/// Display unit of a KPI.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Unit {
    /// Euro amount, shown as `€ 1,234.50`
    Currency,
    /// Fraction, shown as `18.00%`
    Percentage,
    /// Plain count
    Count,
}

/// The nine KPIs computed per delivery channel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Kpi {
    #[serde(rename = "Scontrino medio netto IVA")]
    AverageNetTicket,
    #[serde(rename = "Food & Beverage Cost")]
    FoodBeverageCost,
    #[serde(rename = "Commissioni in %")]
    CommissionRate,
    #[serde(rename = "Commissioni in €")]
    CommissionAmount,
    #[serde(rename = "Costo consegna")]
    DeliveryCost,
    #[serde(rename = "Margine lordo per scontrino")]
    MarginPerTicket,
    #[serde(rename = "Numero ordini mensili")]
    MonthlyOrders,
    #[serde(rename = "Ricavo totale")]
    TotalRevenue,
    #[serde(rename = "Margine lordo totale")]
    TotalGrossMargin,
}

impl Kpi {
    /// All KPIs in declaration order.
    pub const ALL: [Kpi; 9] = [
        Kpi::AverageNetTicket,
        Kpi::FoodBeverageCost,
        Kpi::CommissionRate,
        Kpi::CommissionAmount,
        Kpi::DeliveryCost,
        Kpi::MarginPerTicket,
        Kpi::MonthlyOrders,
        Kpi::TotalRevenue,
        Kpi::TotalGrossMargin,
    ];

    /// Label used in the spreadsheet and in every output.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::AverageNetTicket => "Scontrino medio netto IVA",
            Self::FoodBeverageCost => "Food & Beverage Cost",
            Self::CommissionRate => "Commissioni in %",
            Self::CommissionAmount => "Commissioni in €",
            Self::DeliveryCost => "Costo consegna",
            Self::MarginPerTicket => "Margine lordo per scontrino",
            Self::MonthlyOrders => "Numero ordini mensili",
            Self::TotalRevenue => "Ricavo totale",
            Self::TotalGrossMargin => "Margine lordo totale",
        }
    }

    pub const fn unit(&self) -> Unit {
        match self {
            Self::CommissionRate => Unit::Percentage,
            Self::MonthlyOrders => Unit::Count,
            _ => Unit::Currency,
        }
    }
}

impl Display for Kpi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// KPI -> 1-based row of the source sheet, in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct KpiRowMap {
    rows: Vec<(Kpi, usize)>,
}

impl KpiRowMap {
    /// Builds the map, rejecting row 0 and duplicated KPIs.
    pub fn new(rows: &[(Kpi, usize)]) -> Result<Self, KpiError> {
        for (index, (kpi, row)) in rows.iter().enumerate() {
            if *row == 0 {
                return Err(KpiError::ConfigError(format!("KPI '{kpi}' mapped to row 0, rows are 1-based")));
            }
            if rows[..index].iter().any(|(other, _)| other == kpi) {
                return Err(KpiError::ConfigError(format!("KPI '{kpi}' mapped twice")));
            }
        }
        Ok(Self { rows: rows.to_vec() })
    }

    pub fn iter(&self) -> impl Iterator<Item = (Kpi, usize)> + '_ {
        self.rows.iter().copied()
    }

    pub fn row(&self, kpi: Kpi) -> Option<usize> {
        self.iter().find(|(other, _)| *other == kpi).map(|(_, row)| row)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Channel -> 0-based column index, normalized from column letters.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelColumnMap {
    columns: Vec<(String, usize)>,
}

impl ChannelColumnMap {
    /// Builds the map from (channel, column letters) pairs, rejecting invalid letters.
    pub fn new(columns: &[(&str, &str)]) -> Result<Self, KpiError> {
        let columns = columns
            .iter()
            .map(|(channel, letters)| {
                column_letter_to_index(letters)
                    .map(|index| (channel.to_string(), index))
                    .ok_or_else(|| KpiError::ConfigError(format!("Invalid column '{letters}' for channel '{channel}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { columns })
    }

    pub fn column(&self, channel: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|(name, _)| name == channel)
            .map(|(_, index)| *index)
    }
}

/// Where the KPIs live: sheet name, KPI rows, channel order and channel columns.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    pub sheet_name: String,
    pub kpi_rows: KpiRowMap,
    /// Channels in output order
    pub channels: Vec<String>,
    pub channel_columns: ChannelColumnMap,
}

pub const SHEET_NAME: &str = "CALCOLO";

pub const CHANNELS: [&str; 5] = ["APP INTERNA", "DELIVEROO", "JUST EAT", "UBER EATS", "GLOVO"];

const KPI_ROWS: [(Kpi, usize); 9] = [
    (Kpi::AverageNetTicket, 15),
    (Kpi::FoodBeverageCost, 21),
    (Kpi::CommissionRate, 24),
    (Kpi::CommissionAmount, 25),
    (Kpi::DeliveryCost, 29),
    (Kpi::MarginPerTicket, 33),
    (Kpi::MonthlyOrders, 38),
    (Kpi::TotalRevenue, 41),
    (Kpi::TotalGrossMargin, 44),
];

const CHANNEL_COLUMNS: [(&str, &str); 5] = [
    ("APP INTERNA", "D"),
    ("DELIVEROO", "E"),
    ("JUST EAT", "F"),
    ("UBER EATS", "G"),
    ("GLOVO", "H"),
];

impl Layout {
    pub fn new(
        sheet_name: &str,
        kpi_rows: KpiRowMap,
        channels: &[&str],
        channel_columns: ChannelColumnMap,
    ) -> Self {
        Self {
            sheet_name: sheet_name.to_owned(),
            kpi_rows,
            channels: channels.iter().map(|channel| channel.to_string()).collect(),
            channel_columns,
        }
    }
}

impl Default for Layout {
    /// The layout of the delivery margin workbook: KPIs on rows 15..44, channels on columns D..H.
    fn default() -> Self {
        Self::new(
            SHEET_NAME,
            KpiRowMap::new(&KPI_ROWS).expect("Hardcode KPI rows"),
            &CHANNELS,
            ChannelColumnMap::new(&CHANNEL_COLUMNS).expect("Hardcode channel columns"),
        )
    }
}
