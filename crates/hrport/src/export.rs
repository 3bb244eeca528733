use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::ReportError;

/// MIME type of an xlsx workbook.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A finished export, ready to hand to whoever downloads it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: &'static str,
}

impl ExportArtifact {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
            content_type: XLSX_CONTENT_TYPE,
        }
    }

    /// Write the bytes to `dir/<file_name>`, creating `dir` if needed.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ReportError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|err| ReportError::io(dir, err))?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes).map_err(|err| ReportError::io(&path, err))?;
        Ok(path)
    }
}

/// Expand `{date}` (as `YYYYMMDD`) and `{id}` in a file name pattern.
pub fn render_file_name(pattern: &str, report_id: &str, date: NaiveDate) -> String {
    pattern
        .replace("{date}", &date.format("%Y%m%d").to_string())
        .replace("{id}", report_id)
}
