use std::path::PathBuf;

use thiserror::Error;

/// Failures of the template layer: loading, addressing and serializing workbooks.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template not found at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("template {} is not a readable xlsx workbook: {message}", path.display())]
    Corrupt { path: PathBuf, message: String },

    #[error("sheet `{sheet}` does not exist in the template")]
    UnknownSheet { sheet: String },

    #[error("failed to serialize workbook: {0}")]
    Serialization(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TemplateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TemplateError::Io {
            path: path.into(),
            source,
        }
    }
}
