use chrono::{Duration as ChronoDur, NaiveDate};
use std::fmt::{self, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ───────────────────── Excel date-serial utilities ───────────────────
Excel's serial date system:
  Serial 1  = 1900-01-01
  Serial 59 = 1900-02-28
  Serial 60 = 1900-02-29  (phantom – doesn't exist, but Excel thinks it does)
  Serial 61 = 1900-03-01
Base date = 1899-12-31 so that serial 1 = base + 1 day = 1900-01-01.
------------------------------------------------------------------- */

/// Base date for the 1900 date system. Serial 1 = base + 1 day = 1900-01-01.
const EXCEL_EPOCH: NaiveDate = NaiveDate::from_ymd_opt(1899, 12, 31).unwrap();
const PHANTOM_LEAP_CUTOFF: NaiveDate = NaiveDate::from_ymd_opt(1900, 3, 1).unwrap();

pub fn date_to_serial(date: &NaiveDate) -> f64 {
    let days = (*date - EXCEL_EPOCH).num_days();
    // Dates on or after 1900-03-01 get +1 to account for phantom Feb 29
    let serial_days = if *date >= PHANTOM_LEAP_CUTOFF {
        days + 1
    } else {
        days
    };
    serial_days as f64
}

/// Convert a serial number to a calendar date, dropping any time fraction.
///
/// Returns `None` for serials below 1 or beyond chrono's range.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let days = serial.trunc() as i64;
    if days == 60 {
        return NaiveDate::from_ymd_opt(1900, 2, 28);
    }
    // serial < 60: offset = serial (no phantom day yet)
    // serial > 60: offset = serial - 1 (skip phantom day)
    let offset = if days < 60 { days } else { days - 1 };
    EXCEL_EPOCH.checked_add_signed(ChronoDur::try_days(offset)?)
}

/// Value held by a single worksheet cell as seen by the report pipeline.
///
/// Deliberately narrower than a spreadsheet engine's literal type: the projection only ever
/// writes numbers and text, and read-back only needs to tell numbers, text, booleans and
/// blanks apart.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Boolean(bool),
    Empty,
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Empty => Ok(()),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}
