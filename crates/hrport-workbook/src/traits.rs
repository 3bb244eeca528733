use std::collections::BTreeMap;

use hrport_common::CellValue;

use crate::error::TemplateError;

/// Values of one sheet keyed by 1-based `(row, col)`; blank cells are omitted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SheetData {
    pub cells: BTreeMap<(u32, u32), CellValue>,
    /// `(max_row, max_col)` over non-blank cells; `(0, 0)` for an empty sheet.
    pub dimensions: (u32, u32),
}

impl SheetData {
    pub fn get(&self, row: u32, col: u32) -> &CellValue {
        self.cells.get(&(row, col)).unwrap_or(&CellValue::Empty)
    }

    /// Cells of one row, columns `1..=width`, blanks filled in.
    pub fn row(&self, row: u32, width: u32) -> Vec<CellValue> {
        (1..=width).map(|col| self.get(row, col).clone()).collect()
    }
}

pub trait SpreadsheetReader {
    fn sheet_names(&self) -> Vec<String>;

    fn has_sheet(&self, sheet: &str) -> bool {
        self.sheet_names().iter().any(|name| name == sheet)
    }

    fn read_cell(&self, sheet: &str, row: u32, col: u32) -> Result<CellValue, TemplateError>;

    fn read_sheet(&self, sheet: &str) -> Result<SheetData, TemplateError>;

    /// `(max_row, max_col)` over cells holding a value or formula.
    fn used_bounds(&self, sheet: &str) -> Result<(u32, u32), TemplateError> {
        Ok(self.read_sheet(sheet)?.dimensions)
    }
}

pub trait SpreadsheetWriter {
    fn write_cell(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
        value: &CellValue,
    ) -> Result<(), TemplateError>;
}
