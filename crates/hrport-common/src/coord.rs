//! Column-letter and A1 helpers.
//!
//! All coordinates here are Excel 1-based: row 1 / column 1 is `A1`. Limits follow
//! Excel: 1,048,576 rows × 16,384 columns.

use core::fmt;

/// Highest addressable row (1-based).
pub const ROW_MAX: u32 = 1 << 20;
/// Highest addressable column (1-based, `XFD`).
pub const COL_MAX: u32 = 1 << 14;

/// Errors returned when parsing a bare A1 cell reference such as `$C$3`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum A1ParseError {
    Empty,
    MissingColumn(String),
    MissingRow(String),
    InvalidCharacter(String),
    RowOutOfRange(u64),
    ColOutOfRange(String),
}

impl fmt::Display for A1ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            A1ParseError::Empty => write!(f, "empty cell reference"),
            A1ParseError::MissingColumn(s) => write!(f, "`{s}` has no column letters"),
            A1ParseError::MissingRow(s) => write!(f, "`{s}` has no row number"),
            A1ParseError::InvalidCharacter(s) => {
                write!(f, "`{s}` is not an A1 reference (expected e.g. `B3`)")
            }
            A1ParseError::RowOutOfRange(row) => {
                write!(f, "row {row} is outside 1..={ROW_MAX}")
            }
            A1ParseError::ColOutOfRange(letters) => {
                write!(f, "column `{letters}` is beyond XFD")
            }
        }
    }
}

impl std::error::Error for A1ParseError {}

/// Render a 1-based column index as letters (`1 -> A`, `28 -> AB`).
///
/// Column 0 has no letter form and renders as an empty string.
pub fn column_to_letters(col: u32) -> String {
    if col == 0 {
        return String::new();
    }
    let mut col = col - 1;
    let mut buf = Vec::new();
    loop {
        let rem = (col % 26) as u8;
        buf.push(b'A' + rem);
        col /= 26;
        if col == 0 {
            break;
        }
        col -= 1;
    }
    buf.reverse();
    buf.into_iter().map(char::from).collect()
}

/// Parse column letters into a 1-based index. Letters must be uppercase ASCII.
pub fn letters_to_column(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for ch in s.bytes() {
        if !ch.is_ascii_uppercase() {
            return None;
        }
        col = col.checked_mul(26)?;
        col = col.checked_add((ch - b'A') as u32 + 1)?;
    }
    Some(col)
}

/// Parse a sheet-less A1 reference (`C3`, `$C$3`, `c3`) into `(row, col)`.
pub fn parse_cell_ref(reference: &str) -> Result<(u32, u32), A1ParseError> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return Err(A1ParseError::Empty);
    }

    let upper = trimmed.to_ascii_uppercase();
    let mut chars = upper.chars().peekable();
    if chars.peek() == Some(&'$') {
        chars.next();
    }

    let mut letters = String::new();
    while let Some(c) = chars.peek().copied() {
        if c.is_ascii_alphabetic() {
            letters.push(c);
            chars.next();
        } else {
            break;
        }
    }
    if letters.is_empty() {
        return Err(A1ParseError::MissingColumn(trimmed.to_string()));
    }

    if chars.peek() == Some(&'$') {
        chars.next();
    }
    let digits: String = chars.collect();
    if digits.is_empty() {
        return Err(A1ParseError::MissingRow(trimmed.to_string()));
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(A1ParseError::InvalidCharacter(trimmed.to_string()));
    }

    let row: u64 = digits
        .parse()
        .map_err(|_| A1ParseError::InvalidCharacter(trimmed.to_string()))?;
    if row == 0 || row > ROW_MAX as u64 {
        return Err(A1ParseError::RowOutOfRange(row));
    }
    let col = letters_to_column(&letters)
        .filter(|c| *c <= COL_MAX)
        .ok_or_else(|| A1ParseError::ColOutOfRange(letters.clone()))?;

    Ok((row as u32, col))
}

/// Render `(row, col)` as a relative A1 reference.
pub fn cell_ref(row: u32, col: u32) -> String {
    format!("{}{}", column_to_letters(col), row)
}
