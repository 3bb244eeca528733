//! Typed coercion of raw form input (strings or JSON scalars) into field values.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::manifest::{Field, FieldType};

/// Largest integer magnitude a spreadsheet number cell (an f64) holds exactly.
pub const MAX_EXACT_INTEGER: i64 = 1 << 53;

/// Input date layouts accepted for `date` fields, tried in order.
pub const INPUT_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"];

/// A coerced, typed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Integer(i64),
    Decimal(f64),
    Text(String),
    Date(NaiveDate),
    Empty,
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }
}

/// Why a raw value was rejected for a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    Missing,
    UnknownField,
    NotInteger { raw: String },
    NotNumeric { raw: String },
    NotADate { raw: String },
    NotAnOption { raw: String, options: Vec<String> },
    BelowMinimum { value: f64, min: f64 },
    AboveMaximum { value: f64, max: f64 },
    NotExact { raw: String },
    Unsupported { raw: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Missing => write!(f, "a value is required"),
            Violation::UnknownField => write!(f, "no such field in this report"),
            Violation::NotInteger { raw } => write!(f, "`{raw}` is not a whole number"),
            Violation::NotNumeric { raw } => write!(f, "`{raw}` is not a number"),
            Violation::NotADate { raw } => write!(
                f,
                "`{raw}` is not a date (expected YYYY-MM-DD, DD-MM-YYYY or DD/MM/YYYY)"
            ),
            Violation::NotAnOption { raw, options } => {
                write!(f, "`{raw}` is not one of: {}", options.join(", "))
            }
            Violation::BelowMinimum { value, min } => {
                write!(f, "{value} is below the minimum of {min}")
            }
            Violation::AboveMaximum { value, max } => {
                write!(f, "{value} is above the maximum of {max}")
            }
            Violation::NotExact { raw } => {
                write!(f, "`{raw}` is too large to store exactly in a cell")
            }
            Violation::Unsupported { raw } => {
                write!(f, "`{raw}` is not a scalar value")
            }
        }
    }
}

/// Null and blank strings count as "not supplied".
pub fn is_missing(raw: &JsonValue) -> bool {
    match raw {
        JsonValue::Null => true,
        JsonValue::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Coerce a supplied (non-missing) raw value under the field's declared type and bounds.
pub fn coerce(field: &Field, raw: &JsonValue) -> Result<FieldValue, Violation> {
    if matches!(raw, JsonValue::Array(_) | JsonValue::Object(_)) {
        return Err(Violation::Unsupported {
            raw: raw.to_string(),
        });
    }

    match field.value_type {
        FieldType::Integer => {
            let value = coerce_integer(raw)?;
            if value.unsigned_abs() > MAX_EXACT_INTEGER as u64 {
                return Err(Violation::NotExact {
                    raw: scalar_text(raw),
                });
            }
            check_bounds(field, value as f64)?;
            Ok(FieldValue::Integer(value))
        }
        FieldType::Decimal => {
            let value = coerce_decimal(raw)?;
            check_bounds(field, value)?;
            Ok(FieldValue::Decimal(value))
        }
        FieldType::Text | FieldType::Multiline => Ok(FieldValue::Text(scalar_text(raw))),
        FieldType::Choice => {
            let text = scalar_text(raw);
            let options = field.options.as_deref().unwrap_or_default();
            options
                .iter()
                .find(|option| option.trim() == text.trim())
                .map(|option| FieldValue::Text(option.trim().to_string()))
                .ok_or_else(|| Violation::NotAnOption {
                    raw: text.clone(),
                    options: options.to_vec(),
                })
        }
        FieldType::Date => {
            let text = scalar_text(raw);
            parse_date(&text)
                .map(FieldValue::Date)
                .ok_or(Violation::NotADate { raw: text })
        }
    }
}

/// Parse a date in any of [`INPUT_DATE_FORMATS`].
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    INPUT_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

fn scalar_text(raw: &JsonValue) -> String {
    match raw {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

fn coerce_integer(raw: &JsonValue) -> Result<i64, Violation> {
    match raw {
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            let f = n.as_f64().unwrap_or(f64::NAN);
            float_to_integer(f, &n.to_string())
        }
        JsonValue::String(s) => {
            let cleaned = strip_grouping(s);
            if let Ok(i) = cleaned.parse::<i64>() {
                return Ok(i);
            }
            match cleaned.parse::<f64>() {
                Ok(f) if f.is_finite() => float_to_integer(f, s),
                _ => Err(Violation::NotNumeric { raw: s.clone() }),
            }
        }
        other => Err(Violation::NotNumeric {
            raw: other.to_string(),
        }),
    }
}

fn float_to_integer(f: f64, raw: &str) -> Result<i64, Violation> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Ok(f as i64)
    } else {
        Err(Violation::NotInteger {
            raw: raw.to_string(),
        })
    }
}

fn coerce_decimal(raw: &JsonValue) -> Result<f64, Violation> {
    let parsed = match raw {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => {
            let cleaned = strip_grouping(s);
            let cleaned = cleaned.strip_suffix('%').unwrap_or(&cleaned).trim_end();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .ok_or_else(|| Violation::NotNumeric {
            raw: scalar_text(raw),
        })
}

fn strip_grouping(s: &str) -> String {
    s.trim().chars().filter(|c| *c != ',').collect()
}

fn check_bounds(field: &Field, value: f64) -> Result<(), Violation> {
    if let Some(min) = field.min {
        if value < min {
            return Err(Violation::BelowMinimum { value, min });
        }
    }
    if let Some(max) = field.max {
        if value > max {
            return Err(Violation::AboveMaximum { value, max });
        }
    }
    Ok(())
}
