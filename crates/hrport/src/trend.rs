//! Read-back of an append-mode log sheet as typed rows for trend charts.

use std::path::Path;

use hrport_common::{CellValue, serial_to_date};
use hrport_spec::{FieldType, FieldValue, LogColumnSchema, parse_date};
use hrport_workbook::{SpreadsheetReader, TemplateDocument};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::ReportError;

/// One data row of the log, with values in schema order.
#[derive(Clone, Debug, PartialEq)]
pub struct TrendRow {
    /// 1-based sheet row the values were read from.
    pub row: u32,
    pub values: Vec<(String, FieldValue)>,
}

impl TrendRow {
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }
}

// Flat `{ "row": 2, "Period": "P1", "Headcount": 1200, ... }` objects for the chart side.
impl Serialize for TrendRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("row", &self.row)?;
        for (name, value) in &self.values {
            match value {
                FieldValue::Integer(i) => map.serialize_entry(name, i)?,
                FieldValue::Decimal(d) => map.serialize_entry(name, d)?,
                FieldValue::Text(s) => map.serialize_entry(name, s)?,
                FieldValue::Date(d) => map.serialize_entry(name, &d.format("%Y-%m-%d").to_string())?,
                FieldValue::Empty => map.serialize_entry(name, &())?,
            }
        }
        map.end()
    }
}

/// Read every data row of `sheet` (header in row 1) from the workbook at `path`.
pub fn read_log(
    path: impl AsRef<Path>,
    sheet: &str,
    schema: &[LogColumnSchema],
) -> Result<Vec<TrendRow>, ReportError> {
    let doc = TemplateDocument::open(path)?;
    read_log_at(&doc, sheet, 1, schema)
}

/// Read the rows below `header_row`, zipped positionally against `schema`.
///
/// Returns an empty list when there are no data rows. Entirely blank rows are skipped.
pub fn read_log_at<R: SpreadsheetReader>(
    doc: &R,
    sheet: &str,
    header_row: u32,
    schema: &[LogColumnSchema],
) -> Result<Vec<TrendRow>, ReportError> {
    if !doc.has_sheet(sheet) {
        return Err(ReportError::UnknownSheet {
            sheet: sheet.to_string(),
        });
    }
    let data = doc.read_sheet(sheet)?;
    let (max_row, max_col) = data.dimensions;
    if max_row <= header_row {
        return Ok(Vec::new());
    }
    if (max_col as usize) < schema.len() {
        return Err(ReportError::SchemaMismatch {
            sheet: sheet.to_string(),
            expected: schema.len(),
            found: max_col as usize,
        });
    }

    let width = schema.len() as u32;
    let mut rows = Vec::new();
    for row in header_row + 1..=max_row {
        let cells = data.row(row, width);
        if cells.iter().all(CellValue::is_empty) {
            continue;
        }
        let values = schema
            .iter()
            .zip(cells)
            .map(|(column, cell)| {
                coerce_cell(column.value_type, &cell)
                    .map(|value| (column.name.clone(), value))
                    .ok_or_else(|| ReportError::InvalidLogValue {
                        sheet: sheet.to_string(),
                        row,
                        column: column.name.clone(),
                        raw: cell.to_string(),
                        expected: column.value_type.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(TrendRow { row, values });
    }
    tracing::debug!(sheet, rows = rows.len(), "read log rows");
    Ok(rows)
}

fn coerce_cell(value_type: FieldType, cell: &CellValue) -> Option<FieldValue> {
    if cell.is_empty() {
        return Some(FieldValue::Empty);
    }
    match value_type {
        FieldType::Date => match cell {
            CellValue::Number(serial) => serial_to_date(*serial).map(FieldValue::Date),
            CellValue::Text(text) => parse_date(text).map(FieldValue::Date),
            _ => None,
        },
        FieldType::Integer => {
            let n = numeric(cell)?;
            (n.fract() == 0.0 && n.abs() < i64::MAX as f64).then_some(FieldValue::Integer(n as i64))
        }
        FieldType::Decimal => numeric(cell).map(FieldValue::Decimal),
        FieldType::Text | FieldType::Choice | FieldType::Multiline => {
            Some(FieldValue::Text(cell.to_string()))
        }
    }
}

fn numeric(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) => Some(*n),
        CellValue::Text(text) => {
            let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
            let cleaned = cleaned.strip_suffix('%').unwrap_or(&cleaned);
            cleaned.trim_end().parse::<f64>().ok().filter(|n| n.is_finite())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn cells_coerce_per_column_type() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        assert_eq!(
            coerce_cell(FieldType::Date, &CellValue::Number(45838.0)),
            Some(FieldValue::Date(date))
        );
        assert_eq!(
            coerce_cell(FieldType::Date, &CellValue::Text("30-06-2025".into())),
            Some(FieldValue::Date(date))
        );
        assert_eq!(
            coerce_cell(FieldType::Integer, &CellValue::Text("1,200".into())),
            Some(FieldValue::Integer(1200))
        );
        assert_eq!(
            coerce_cell(FieldType::Decimal, &CellValue::Text("4.5%".into())),
            Some(FieldValue::Decimal(4.5))
        );
        assert_eq!(
            coerce_cell(FieldType::Text, &CellValue::Number(1200.0)),
            Some(FieldValue::Text("1200".into()))
        );
        assert_eq!(
            coerce_cell(FieldType::Integer, &CellValue::Empty),
            Some(FieldValue::Empty)
        );
        assert_eq!(coerce_cell(FieldType::Integer, &CellValue::Number(2.5)), None);
        assert_eq!(
            coerce_cell(FieldType::Date, &CellValue::Text("soon".into())),
            None
        );
    }

    #[test]
    fn rows_serialize_flat_in_column_order() {
        let row = TrendRow {
            row: 2,
            values: vec![
                ("Period".into(), FieldValue::Text("P1".into())),
                (
                    "Period End".into(),
                    FieldValue::Date(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()),
                ),
                ("Headcount".into(), FieldValue::Integer(1200)),
                ("Engagement".into(), FieldValue::Empty),
            ],
        };
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"row":2,"Period":"P1","Period End":"2025-06-15","Headcount":1200,"Engagement":null}"#
        );
    }
}
