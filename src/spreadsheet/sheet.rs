use crate::spreadsheet::cell::Cell;
use std::collections::HashMap;

/// A worksheet as a sparse grid of non-empty cells.
///
/// Positions are 0-based. The used range grows as cells are pushed; any lookup
/// outside of it, or on a position without a stored cell, finds nothing.
#[derive(Clone, Debug, Default)]
pub struct Sheet {
    /// Sheet name as declared in the workbook
    pub name: String,
    cells: Vec<Cell>,
    /// (row, column) -> position in `cells`
    indexes: HashMap<(usize, usize), usize>,
    pub(crate) row_lower_bound: Option<usize>,
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_lower_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    /// Builds a sheet from rows of optional numbers, `rows[0][0]` landing on `A1`.
    pub fn from_rows(name: &str, rows: &[Vec<Option<f64>>]) -> Self {
        let mut sheet = Self::new(name);
        for (row, values) in rows.iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                if let Some(value) = value {
                    sheet.push(Cell::number(row, col, *value));
                }
            }
        }
        sheet
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Adds a cell; a later cell at the same position replaces the earlier one.
    pub fn push(&mut self, cell: Cell) {
        self.update_bound(cell.row, cell.col);
        match self.indexes.get(&(cell.row, cell.col)) {
            Some(index) => self.cells[*index] = cell,
            None => {
                self.indexes.insert((cell.row, cell.col), self.cells.len());
                self.cells.push(cell);
            }
        }
    }

    fn update_bound(&mut self, row: usize, col: usize) {
        if self.row_lower_bound.map(|bound| row < bound).unwrap_or(true) {
            self.row_lower_bound = Some(row);
        }
        if self.row_upper_bound.map(|bound| bound < row).unwrap_or(true) {
            self.row_upper_bound = Some(row);
        }
        if self.col_lower_bound.map(|bound| col < bound).unwrap_or(true) {
            self.col_lower_bound = Some(col);
        }
        if self.col_upper_bound.map(|bound| bound < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
    }

    /// Checks if (row, col) lies inside the used range.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        match (self.row_lower_bound, self.row_upper_bound, self.col_lower_bound, self.col_upper_bound) {
            (Some(row_lower), Some(row_upper), Some(col_lower), Some(col_upper)) => {
                (row_lower..=row_upper).contains(&row) && (col_lower..=col_upper).contains(&col)
            }
            _ => false,
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        if self.contains(row, col) {
            self.indexes
                .get(&(row, col))
                .and_then(|index| self.cells.get(*index))
        } else {
            None
        }
    }

    /// Finite number stored at (row, col), `None` when empty, out of range or not numeric.
    pub fn number(&self, row: usize, col: usize) -> Option<f64> {
        self.get(row, col).and_then(Cell::as_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::CellType;

    #[test]
    fn sheet_initial() {
        let sheet = Sheet::new("CALCOLO");

        assert!(sheet.is_empty());
        assert_eq!(sheet.row_lower_bound, None);
        assert_eq!(sheet.col_upper_bound, None);
        assert_eq!(sheet.get(0, 0), None);
    }

    #[test]
    fn sheet_update() {
        let mut sheet = Sheet::new("CALCOLO");
        sheet.push(Cell::number(14, 3, 12.5));
        sheet.push(Cell::number(43, 7, 275.25));
        sheet.push(Cell::text(0, 1, "Canale"));

        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet.row_lower_bound, Some(0));
        assert_eq!(sheet.row_upper_bound, Some(43));
        assert_eq!(sheet.col_lower_bound, Some(1));
        assert_eq!(sheet.col_upper_bound, Some(7));
    }

    #[test]
    fn lookups() {
        let mut sheet = Sheet::new("CALCOLO");
        sheet.push(Cell::number(14, 3, 12.5));
        sheet.push(Cell::text(15, 3, "n/a"));
        sheet.push(Cell { row: 16, col: 3, kind: CellType::Error, value: "#REF!".to_owned() });

        assert_eq!(sheet.number(14, 3), Some(12.5));
        assert_eq!(sheet.number(15, 3), None);
        assert_eq!(sheet.get(15, 3).map(|cell| cell.value.as_str()), Some("n/a"));
        assert_eq!(sheet.number(16, 3), None);
        assert_eq!(sheet.number(14, 4), None);
        assert_eq!(sheet.number(100, 3), None);
    }

    #[test]
    fn later_cell_replaces_earlier_one() {
        let mut sheet = Sheet::new("CALCOLO");
        sheet.push(Cell::number(2, 2, 1.0));
        sheet.push(Cell::number(2, 2, 2.0));

        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.number(2, 2), Some(2.0));
    }

    #[test]
    fn from_rows_skips_missing_values() {
        let sheet = Sheet::from_rows("CALCOLO", &[vec![None, Some(1.0)], vec![Some(2.0)]]);

        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.number(0, 0), None);
        assert_eq!(sheet.number(0, 1), Some(1.0));
        assert_eq!(sheet.number(1, 0), Some(2.0));
    }
}
