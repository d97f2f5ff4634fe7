use crate::spreadsheet::reference::index_to_reference;
use std::fmt::Display;

/// Types of cell data found in a worksheet.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum CellType {
    /// Numeric values, including cached formula results
    #[default]
    Number,
    /// Boolean values (stored as 0/1)
    Boolean,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Inline or formula string values
    InlineString,
    /// Text resolved from the shared string table
    SharedString,
    /// Error values such as `#DIV/0!`
    Error,
}

impl CellType {
    /// Maps the `t` attribute of a `<c>` element.
    pub(crate) fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some("inlineStr") | Some("str") => Self::InlineString,
            Some("s") => Self::SharedString,
            Some("d") => Self::IsoDateTime,
            Some("b") => Self::Boolean,
            Some("e") => Self::Error,
            _ => Self::Number,
        }
    }
}

/// A single non-empty cell with its 0-based position and raw value.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub kind: CellType,
    pub value: String,
}

impl Cell {
    /// Numeric cell, mostly useful for building sheets in memory.
    pub fn number(row: usize, col: usize, value: f64) -> Self {
        Self {
            row,
            col,
            kind: CellType::Number,
            value: value.to_string(),
        }
    }

    /// Text cell.
    pub fn text(row: usize, col: usize, value: &str) -> Self {
        Self {
            row,
            col,
            kind: CellType::InlineString,
            value: value.to_owned(),
        }
    }

    /// Excel-style reference, e.g. `D15`.
    pub fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Parses the raw value as a double.
    pub fn to_double(&self) -> Result<f64, String> {
        self.value
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("parse '{}' at {} to double failed", self.value, self.reference()))
    }

    /// Finite numeric value of a `Number` cell; every other kind is not a number.
    pub fn as_number(&self) -> Option<f64> {
        match self.kind {
            CellType::Number => self.to_double().ok().filter(|value| value.is_finite()),
            _ => None,
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            CellType::Boolean => write!(f, "{}", self.value == "1"),
            CellType::IsoDateTime => write!(f, "{}", self.value.replace('T', " ")),
            _ => write!(f, "{}", self.value),
        }
    }
}
