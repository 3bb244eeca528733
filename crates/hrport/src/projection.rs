//! Writes collected form values into a template document.

use hrport_common::{CellAddress, CellValue, RangeAddress};
use hrport_spec::{FieldValue, Violation};
use hrport_workbook::{SpreadsheetReader, SpreadsheetWriter};

use crate::binding::{BoundTarget, LogBinding, ReportBinding};
use crate::error::ReportError;
use crate::form::FormValues;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectionMode {
    /// Fixed-cell writes over the template's existing content.
    Overwrite,
    /// One new row below the last used row of the log sheet.
    Append,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Projection {
    pub cells_written: usize,
    /// Row index written in append mode.
    pub appended_row: Option<u32>,
}

/// Apply `values` to `doc` according to `binding`.
///
/// Overwrite clears the target of an empty field. Append rejects a row in which every
/// log column is empty with [`Violation::Missing`] on the first column.
///
/// Every sheet the projection touches is checked before the first write, so an
/// [`ReportError::UnknownSheet`] leaves the document unchanged.
pub fn project<D>(
    values: &FormValues,
    binding: &ReportBinding,
    doc: &mut D,
    mode: ProjectionMode,
) -> Result<Projection, ReportError>
where
    D: SpreadsheetReader + SpreadsheetWriter,
{
    match mode {
        ProjectionMode::Overwrite => overwrite(values, binding, doc),
        ProjectionMode::Append => {
            let log = binding.log().ok_or_else(|| ReportError::NotAppendable {
                report: binding.report_id().to_string(),
            })?;
            let row = append(values, log, doc)?;
            Ok(Projection {
                cells_written: log.columns.len(),
                appended_row: Some(row),
            })
        }
    }
}

fn overwrite<D>(
    values: &FormValues,
    binding: &ReportBinding,
    doc: &mut D,
) -> Result<Projection, ReportError>
where
    D: SpreadsheetReader + SpreadsheetWriter,
{
    for field in binding.fields() {
        let sheets = field
            .target
            .iter()
            .map(BoundTarget::sheet)
            .chain(field.label_target.iter().map(|cell| cell.sheet.as_str()));
        for sheet in sheets {
            ensure_sheet(doc, sheet)?;
        }
    }

    let mut written = 0;
    for field in binding.fields() {
        if let Some(label) = &field.label_target {
            write(doc, label, &CellValue::Text(field.label.clone()))?;
            written += 1;
        }
        let Some(target) = &field.target else {
            continue;
        };
        let value = values.get(&field.field);
        match target {
            BoundTarget::Cell(cell) => {
                write(doc, cell, &to_cell(value, &field.date_format))?;
                written += 1;
            }
            BoundTarget::Lines(range) if value.is_empty() => {
                doc.write_cell(&range.sheet, range.start_row, range.start_col, &CellValue::Empty)?;
                written += 1;
            }
            BoundTarget::Lines(range) => {
                let text = to_cell(value, &field.date_format).to_string();
                written += write_lines(doc, &field.field, range, &text)?;
            }
        }
    }
    tracing::debug!(cells = written, "projected form values");
    Ok(Projection {
        cells_written: written,
        appended_row: None,
    })
}

/// One line per row from the top of the range; surplus lines are folded into the last row.
fn write_lines<D: SpreadsheetWriter>(
    doc: &mut D,
    field: &str,
    range: &RangeAddress,
    text: &str,
) -> Result<usize, ReportError> {
    let lines: Vec<&str> = text.lines().collect();
    let rows = range.height() as usize;
    if lines.len() > rows {
        tracing::warn!(
            field,
            lines = lines.len(),
            rows,
            "more lines than target rows, joining the rest into the last row"
        );
    }

    let mut written = 0;
    for (offset, row) in (range.start_row..=range.end_row).enumerate() {
        let Some(line) = lines.get(offset) else {
            break;
        };
        let text = if offset + 1 == rows && lines.len() > rows {
            lines[offset..].join("\n")
        } else {
            line.to_string()
        };
        doc.write_cell(&range.sheet, row, range.start_col, &CellValue::Text(text))?;
        written += 1;
    }
    Ok(written)
}

fn append<D>(values: &FormValues, log: &LogBinding, doc: &mut D) -> Result<u32, ReportError>
where
    D: SpreadsheetReader + SpreadsheetWriter,
{
    ensure_sheet(doc, &log.sheet)?;
    // a row with no values would leave the sheet unchanged and the next append would reuse it
    if log
        .columns
        .iter()
        .all(|column| values.get(&column.field).is_empty())
    {
        let field = log
            .columns
            .first()
            .map(|column| column.field.clone())
            .unwrap_or_default();
        return Err(ReportError::Validation {
            field,
            violation: Violation::Missing,
        });
    }

    let data = doc.read_sheet(&log.sheet)?;
    let (max_used_row, _) = data.dimensions;

    let header_empty = data.cells.keys().all(|(row, _)| *row != log.header_row);
    if header_empty {
        for (idx, column) in log.columns.iter().enumerate() {
            doc.write_cell(
                &log.sheet,
                log.header_row,
                idx as u32 + 1,
                &CellValue::Text(column.name.clone()),
            )?;
        }
    }

    let row = max_used_row.max(log.header_row) + 1;
    for (idx, column) in log.columns.iter().enumerate() {
        let value = values.get(&column.field);
        if value.is_empty() {
            continue;
        }
        doc.write_cell(
            &log.sheet,
            row,
            idx as u32 + 1,
            &to_cell(value, &column.date_format),
        )?;
    }
    tracing::info!(sheet = %log.sheet, row, "appended log row");
    Ok(row)
}

fn ensure_sheet<D: SpreadsheetReader>(doc: &D, sheet: &str) -> Result<(), ReportError> {
    if doc.has_sheet(sheet) {
        Ok(())
    } else {
        Err(ReportError::UnknownSheet {
            sheet: sheet.to_string(),
        })
    }
}

fn write<D: SpreadsheetWriter>(
    doc: &mut D,
    cell: &CellAddress,
    value: &CellValue,
) -> Result<(), ReportError> {
    doc.write_cell(&cell.sheet, cell.row, cell.col, value)?;
    Ok(())
}

/// Numbers become numeric cells; everything else is written as text.
pub fn to_cell(value: &FieldValue, date_format: &str) -> CellValue {
    match value {
        FieldValue::Integer(i) => CellValue::Number(*i as f64),
        FieldValue::Decimal(d) => CellValue::Number(*d),
        FieldValue::Text(s) => CellValue::Text(s.clone()),
        FieldValue::Date(d) => CellValue::Text(d.format(date_format).to_string()),
        FieldValue::Empty => CellValue::Empty,
    }
}
