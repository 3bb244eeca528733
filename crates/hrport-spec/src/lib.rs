//! Report manifest: the declarative definition of an HR report form.
//!
//! A manifest lists ordered sections of typed fields and binds every exported field to a
//! cell of an xlsx template (or, for tracker reports, to a column of an append-only log
//! sheet). This crate owns parsing, validation, typed input coercion and the JSON schema;
//! binding to a real workbook lives in `hrport`.

pub mod bundled;
pub mod coerce;
pub mod manifest;
pub mod validation;

pub use bundled::{BUNDLED_REPORTS, bundled, bundled_yaml};
pub use coerce::{
    FieldValue, INPUT_DATE_FORMATS, MAX_EXACT_INTEGER, Violation, coerce, is_missing, parse_date,
};
pub use manifest::*;
pub use validation::{ManifestIssue, ValidationError};

/// JSON schema for the manifest format as a `serde_json::Value`.
pub fn generate_schema_value() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(Manifest)).unwrap_or(serde_json::Value::Null)
}

/// Pretty-printed JSON schema for the manifest format.
pub fn generate_schema_json_pretty() -> String {
    serde_json::to_string_pretty(&generate_schema_value()).unwrap_or_default()
}
