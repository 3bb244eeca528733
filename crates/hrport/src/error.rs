use std::path::PathBuf;

use hrport_spec::{ValidationError, Violation};
use hrport_workbook::TemplateError;
use thiserror::Error;

/// Every failure surfaced by the report pipeline.
///
/// Either all writes of an operation succeed and bytes are produced, or one of these is
/// returned and nothing leaves the process.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("template not found at {}", path.display())]
    TemplateNotFound { path: PathBuf },

    #[error("template {} could not be parsed: {message}", path.display())]
    TemplateCorrupt { path: PathBuf, message: String },

    #[error("field `{field}`: {violation}")]
    Validation { field: String, violation: Violation },

    #[error("sheet `{sheet}` does not exist in the template")]
    UnknownSheet { sheet: String },

    #[error("log sheet `{sheet}` has {found} used columns but the schema expects {expected}")]
    SchemaMismatch {
        sheet: String,
        expected: usize,
        found: usize,
    },

    #[error("log sheet `{sheet}` row {row}, column `{column}`: cannot read `{raw}` as {expected}")]
    InvalidLogValue {
        sheet: String,
        row: u32,
        column: String,
        raw: String,
        expected: String,
    },

    #[error("failed to serialize workbook: {0}")]
    Serialization(String),

    #[error("invalid report manifest: {0}")]
    Manifest(#[from] ValidationError),

    #[error("report manifest is not valid YAML: {0}")]
    ManifestParse(#[from] serde_yaml::Error),

    #[error("field `{field}` targets defined name `{name}`, which {reason}")]
    UnresolvedName {
        field: String,
        name: String,
        reason: String,
    },

    #[error("report `{report}` declares no log sheet and cannot append")]
    NotAppendable { report: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<TemplateError> for ReportError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::NotFound { path } => ReportError::TemplateNotFound { path },
            TemplateError::Corrupt { path, message } => {
                ReportError::TemplateCorrupt { path, message }
            }
            TemplateError::UnknownSheet { sheet } => ReportError::UnknownSheet { sheet },
            TemplateError::Serialization(message) => ReportError::Serialization(message),
            TemplateError::Io { path, source } => ReportError::Io { path, source },
        }
    }
}
