//! HR report runtime.
//!
//! Links [`hrport_spec::Manifest`] report definitions to xlsx templates loaded through
//! `hrport-workbook`: typed collection of form input, projection into fixed cells or an
//! append-only log, deterministic export, and read-back of the log for trend charts.

mod binding;
mod error;
mod export;
mod form;
mod projection;
mod session;
mod trend;

pub use binding::{
    BoundTarget, FieldBinding, LogBinding, LogColumnBinding, NameResolver, ReportBinding,
};
pub use error::ReportError;
pub use export::{ExportArtifact, XLSX_CONTENT_TYPE, render_file_name};
pub use form::{FormModel, FormValues, RawInputs};
pub use projection::{Projection, ProjectionMode, project, to_cell};
pub use session::{Appended, ReportSession};
pub use trend::{TrendRow, read_log, read_log_at};

pub use hrport_spec::{FieldType, FieldValue, Manifest, Violation};
pub use hrport_workbook::{ExportOptions, TemplateDocument, TemplateStore};
