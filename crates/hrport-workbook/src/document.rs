use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use hrport_common::{CellValue, SheetReference};
use umya_spreadsheet::{CellRawValue, Spreadsheet, Worksheet, reader::xlsx};

use crate::error::TemplateError;
use crate::traits::{SheetData, SpreadsheetReader, SpreadsheetWriter};

/// An in-memory, mutable copy of a template workbook.
///
/// Every export works on its own document; the parsed template held by
/// [`TemplateStore`](crate::TemplateStore) is never mutated.
#[derive(Clone, Debug)]
pub struct TemplateDocument {
    book: Spreadsheet,
    source: Option<PathBuf>,
}

impl TemplateDocument {
    pub(crate) fn from_parts(book: Spreadsheet, source: Option<PathBuf>) -> Self {
        Self { book, source }
    }

    /// Parse a workbook from disk without going through a store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TemplateError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let book = xlsx::read(path).map_err(|err| TemplateError::Corrupt {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Ok(Self::from_parts(book, Some(path.to_path_buf())))
    }

    /// Parse a workbook from raw xlsx bytes, e.g. a previously exported artifact.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TemplateError> {
        let book = xlsx::read_reader(Cursor::new(bytes), true).map_err(|err| {
            TemplateError::Corrupt {
                path: PathBuf::from("<memory>"),
                message: err.to_string(),
            }
        })?;
        Ok(Self::from_parts(book, None))
    }

    /// Path the template was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn book(&self) -> &Spreadsheet {
        &self.book
    }

    pub fn book_mut(&mut self) -> &mut Spreadsheet {
        &mut self.book
    }

    /// Highest row holding a value or formula; 0 when the sheet is blank.
    ///
    /// Cells that only carry styling do not count.
    pub fn max_used_row(&self, sheet: &str) -> Result<u32, TemplateError> {
        Ok(self.used_bounds(sheet)?.0)
    }

    pub fn max_used_col(&self, sheet: &str) -> Result<u32, TemplateError> {
        Ok(self.used_bounds(sheet)?.1)
    }

    /// Look a defined name up, workbook scope first, then sheet scope.
    ///
    /// Returns `None` when the name is not defined or its address cannot be parsed.
    pub fn resolve_defined_name(&self, name: &str) -> Option<SheetReference> {
        let workbook_scope = self.book.get_defined_names().iter();
        let sheet_scope = self
            .book
            .get_sheet_collection()
            .iter()
            .flat_map(|ws| ws.get_defined_names().iter());
        workbook_scope
            .chain(sheet_scope)
            .find(|defined| defined.get_name().eq_ignore_ascii_case(name))
            .and_then(|defined| SheetReference::parse(&defined.get_address()).ok())
    }

    /// Stamp the document properties so repeated exports carry the same metadata.
    pub fn stamp_properties(&mut self, at: DateTime<Utc>) {
        let stamp = at.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let properties = self.book.get_properties_mut();
        properties.set_created(stamp.clone());
        properties.set_modified(stamp);
    }

    fn sheet(&self, sheet: &str) -> Result<&Worksheet, TemplateError> {
        self.book
            .get_sheet_by_name(sheet)
            .ok_or_else(|| TemplateError::UnknownSheet {
                sheet: sheet.to_string(),
            })
    }

    fn sheet_mut(&mut self, sheet: &str) -> Result<&mut Worksheet, TemplateError> {
        self.book
            .get_sheet_by_name_mut(sheet)
            .ok_or_else(|| TemplateError::UnknownSheet {
                sheet: sheet.to_string(),
            })
    }
}

fn convert_cell_value(cv: &umya_spreadsheet::CellValue) -> CellValue {
    match cv.get_raw_value() {
        CellRawValue::Numeric(n) => CellValue::Number(*n),
        CellRawValue::Bool(b) => CellValue::Boolean(*b),
        CellRawValue::String(s) => CellValue::Text(s.to_string()),
        CellRawValue::RichText(rt) => CellValue::Text(rt.get_text().to_string()),
        CellRawValue::Lazy(s) => {
            let txt: &str = s.as_ref();
            if let Ok(n) = txt.parse::<f64>() {
                CellValue::Number(n)
            } else if txt.eq_ignore_ascii_case("TRUE") {
                CellValue::Boolean(true)
            } else if txt.eq_ignore_ascii_case("FALSE") {
                CellValue::Boolean(false)
            } else {
                CellValue::Text(txt.to_string())
            }
        }
        // error literals are surfaced as their display text (`#N/A`, ...)
        CellRawValue::Error(_) => CellValue::Text(cv.get_value().to_string()),
        CellRawValue::Empty => CellValue::Empty,
    }
}

impl SpreadsheetReader for TemplateDocument {
    fn sheet_names(&self) -> Vec<String> {
        self.book
            .get_sheet_collection()
            .iter()
            .map(|ws| ws.get_name().to_string())
            .collect()
    }

    fn has_sheet(&self, sheet: &str) -> bool {
        self.book.get_sheet_by_name(sheet).is_some()
    }

    fn read_cell(&self, sheet: &str, row: u32, col: u32) -> Result<CellValue, TemplateError> {
        let ws = self.sheet(sheet)?;
        // umya addresses cells as (col, row)
        Ok(ws
            .get_cell((col, row))
            .map(|cell| convert_cell_value(cell.get_cell_value()))
            .unwrap_or(CellValue::Empty))
    }

    fn read_sheet(&self, sheet: &str) -> Result<SheetData, TemplateError> {
        let ws = self.sheet(sheet)?;
        let mut cells: BTreeMap<(u32, u32), CellValue> = BTreeMap::new();
        let mut dims = (0u32, 0u32);
        for cell in ws.get_cell_collection() {
            let coord = cell.get_coordinate();
            let col = *coord.get_col_num();
            let row = *coord.get_row_num();
            let cv = cell.get_cell_value();
            let value = convert_cell_value(cv);
            if value.is_empty() && !cv.is_formula() {
                continue;
            }
            dims = (dims.0.max(row), dims.1.max(col));
            if !value.is_empty() {
                cells.insert((row, col), value);
            }
        }
        Ok(SheetData {
            cells,
            dimensions: dims,
        })
    }
}

impl SpreadsheetWriter for TemplateDocument {
    fn write_cell(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
        value: &CellValue,
    ) -> Result<(), TemplateError> {
        let ws = self.sheet_mut(sheet)?;
        let cell = ws.get_cell_mut((col, row));
        match value {
            CellValue::Number(n) => {
                cell.set_value_number(*n);
            }
            CellValue::Text(s) => {
                cell.set_value_string(s.as_str());
            }
            CellValue::Boolean(b) => {
                cell.set_value_bool(*b);
            }
            CellValue::Empty => {
                cell.set_blank();
            }
        }
        Ok(())
    }
}
