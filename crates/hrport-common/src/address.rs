//! Sheet-qualified cell and range addresses (`'Executive Summary'!C3`, `Log!A2:E2`).

use std::error::Error;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::coord::{A1ParseError, cell_ref, parse_cell_ref};

/// Errors that can occur while parsing or constructing sheet-qualified addresses.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SheetAddressError {
    /// Reference did not carry a `Sheet!` prefix.
    MissingSheetName(String),
    /// Quoted sheet name was not terminated.
    UnterminatedQuote(String),
    /// Start/end coordinates were not ordered (start <= end).
    RangeOrder(String),
    /// Wrapped [`A1ParseError`] originating from the cell part.
    Parse(A1ParseError),
}

impl fmt::Display for SheetAddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetAddressError::MissingSheetName(s) => {
                write!(f, "`{s}` must be qualified with a sheet name (e.g. `Sheet1!B3`)")
            }
            SheetAddressError::UnterminatedQuote(s) => {
                write!(f, "`{s}` has an unterminated quoted sheet name")
            }
            SheetAddressError::RangeOrder(s) => {
                write!(
                    f,
                    "range `{s}` must be ordered so the start is above/left of the end"
                )
            }
            SheetAddressError::Parse(err) => err.fmt(f),
        }
    }
}

impl Error for SheetAddressError {}

impl From<A1ParseError> for SheetAddressError {
    fn from(value: A1ParseError) -> Self {
        SheetAddressError::Parse(value)
    }
}

/// A single cell on a named sheet. Row and column are 1-based.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellAddress {
    pub sheet: String,
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    pub fn new(sheet: impl Into<String>, row: u32, col: u32) -> Self {
        Self {
            sheet: sheet.into(),
            row,
            col,
        }
    }

    /// Parse `Sheet!B3`; a range is rejected.
    pub fn parse(reference: &str) -> Result<Self, SheetAddressError> {
        let (sheet, cell) = split_sheet(reference)?;
        let (row, col) = parse_cell_ref(cell)?;
        Ok(Self::new(sheet, row, col))
    }

    /// Sheet-less `B3` form.
    pub fn local(&self) -> String {
        cell_ref(self.row, self.col)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", quote_sheet(&self.sheet), self.local())
    }
}

/// Inclusive rectangular range on a named sheet. Bounds are 1-based.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RangeAddress {
    pub sheet: String,
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl RangeAddress {
    pub fn new(
        sheet: impl Into<String>,
        start_row: u32,
        start_col: u32,
        end_row: u32,
        end_col: u32,
    ) -> Result<Self, &'static str> {
        if start_row == 0 || start_col == 0 || end_row == 0 || end_col == 0 {
            return Err("Row and column indices must be 1-based");
        }
        if start_row > end_row || start_col > end_col {
            return Err("Range must be ordered: start <= end");
        }
        Ok(Self {
            sheet: sheet.into(),
            start_row,
            start_col,
            end_row,
            end_col,
        })
    }

    pub fn width(&self) -> u32 {
        self.end_col - self.start_col + 1
    }

    pub fn height(&self) -> u32 {
        self.end_row - self.start_row + 1
    }

    /// Top-left cell of the range.
    pub fn top_left(&self) -> CellAddress {
        CellAddress::new(self.sheet.clone(), self.start_row, self.start_col)
    }
}

impl fmt::Display for RangeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}!{}:{}",
            quote_sheet(&self.sheet),
            cell_ref(self.start_row, self.start_col),
            cell_ref(self.end_row, self.end_col)
        )
    }
}

/// Either a single cell or a range, as written in a report manifest.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SheetReference {
    Cell(CellAddress),
    Range(RangeAddress),
}

impl SheetReference {
    /// Parse `Sheet!B3` or `Sheet!B3:B9`. A degenerate range such as `B3:B3` is a cell.
    pub fn parse(reference: &str) -> Result<Self, SheetAddressError> {
        let (sheet, body) = split_sheet(reference)?;
        match body.split_once(':') {
            None => {
                let (row, col) = parse_cell_ref(body)?;
                Ok(SheetReference::Cell(CellAddress::new(sheet, row, col)))
            }
            Some((start, end)) => {
                let (start_row, start_col) = parse_cell_ref(start)?;
                let (end_row, end_col) = parse_cell_ref(end)?;
                if start_row == end_row && start_col == end_col {
                    return Ok(SheetReference::Cell(CellAddress::new(
                        sheet, start_row, start_col,
                    )));
                }
                RangeAddress::new(sheet, start_row, start_col, end_row, end_col)
                    .map(SheetReference::Range)
                    .map_err(|_| SheetAddressError::RangeOrder(reference.to_string()))
            }
        }
    }

    pub fn sheet(&self) -> &str {
        match self {
            SheetReference::Cell(cell) => &cell.sheet,
            SheetReference::Range(range) => &range.sheet,
        }
    }
}

impl fmt::Display for SheetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetReference::Cell(cell) => cell.fmt(f),
            SheetReference::Range(range) => range.fmt(f),
        }
    }
}

/// Split `Sheet!Body` / `'Quoted Sheet'!Body` into `(sheet, body)`.
fn split_sheet(reference: &str) -> Result<(String, &str), SheetAddressError> {
    let trimmed = reference.trim();
    if let Some(rest) = trimmed.strip_prefix('\'') {
        let mut name = String::new();
        let mut chars = rest.char_indices();
        while let Some((idx, ch)) = chars.next() {
            if ch != '\'' {
                name.push(ch);
                continue;
            }
            // '' escapes a literal quote inside the name
            if rest[idx + 1..].starts_with('\'') {
                name.push('\'');
                chars.next();
                continue;
            }
            let after = &rest[idx + 1..];
            return match after.strip_prefix('!') {
                Some(body) if !name.is_empty() => Ok((name, body)),
                _ => Err(SheetAddressError::MissingSheetName(trimmed.to_string())),
            };
        }
        return Err(SheetAddressError::UnterminatedQuote(trimmed.to_string()));
    }

    match trimmed.rsplit_once('!') {
        Some((sheet, body)) if !sheet.is_empty() => Ok((sheet.to_string(), body)),
        _ => Err(SheetAddressError::MissingSheetName(trimmed.to_string())),
    }
}

fn quote_sheet(sheet: &str) -> String {
    let plain = !sheet.is_empty()
        && sheet
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if plain {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}
