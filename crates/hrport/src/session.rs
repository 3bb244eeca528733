use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use hrport_spec::Manifest;
use hrport_workbook::{ExportOptions, TemplateDocument, TemplateStore, serialize};

use crate::binding::ReportBinding;
use crate::error::ReportError;
use crate::export::{ExportArtifact, render_file_name};
use crate::form::{FormModel, FormValues, RawInputs};
use crate::projection::{ProjectionMode, project};
use crate::trend::{TrendRow, read_log_at};

/// Result of an append: the row written and the exported workbook containing it.
#[derive(Debug)]
pub struct Appended {
    pub row: u32,
    pub artifact: ExportArtifact,
    /// Set when the log was written back over the template.
    pub persisted_to: Option<PathBuf>,
}

/// A report bound to one template file: collects submissions, exports, appends and reads
/// the log back.
///
/// Each operation loads its own copy of the template from the store, so a session can be
/// reused for any number of submissions.
pub struct ReportSession {
    store: Arc<TemplateStore>,
    template: PathBuf,
    binding: ReportBinding,
    form: FormModel,
    options: ExportOptions,
}

impl ReportSession {
    /// Validate `manifest` and bind its targets against the template at `template`.
    pub fn open(
        store: Arc<TemplateStore>,
        template: impl Into<PathBuf>,
        manifest: Manifest,
    ) -> Result<Self, ReportError> {
        let template = template.into();
        let doc = store.load(&template)?;
        let binding = ReportBinding::bind(manifest, &doc)?;
        let form = FormModel::from_manifest(binding.manifest());
        Ok(Self {
            store,
            template,
            binding,
            form,
            options: ExportOptions::default(),
        })
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn form(&self) -> &FormModel {
        &self.form
    }

    pub fn binding(&self) -> &ReportBinding {
        &self.binding
    }

    pub fn template_path(&self) -> &Path {
        &self.template
    }

    pub fn collect(&self, raw: &RawInputs) -> Result<FormValues, ReportError> {
        self.form.collect(raw)
    }

    /// Collect, project into fixed cells and serialize. `date` feeds the file name.
    pub fn export(&self, raw: &RawInputs, date: NaiveDate) -> Result<ExportArtifact, ReportError> {
        let values = self.collect(raw)?;
        self.export_values(&values, date)
    }

    pub fn export_values(
        &self,
        values: &FormValues,
        date: NaiveDate,
    ) -> Result<ExportArtifact, ReportError> {
        let _span = tracing::info_span!("export", report = %self.binding.report_id()).entered();
        let mut doc = self.store.load(&self.template)?;
        let projection = project(values, &self.binding, &mut doc, ProjectionMode::Overwrite)?;
        let artifact = self.finish(&doc, date)?;
        tracing::info!(
            cells = projection.cells_written,
            file = %artifact.file_name,
            bytes = artifact.bytes.len(),
            "export ready"
        );
        Ok(artifact)
    }

    /// Collect and append one log row. The template on disk is left untouched.
    pub fn append(&self, raw: &RawInputs, date: NaiveDate) -> Result<Appended, ReportError> {
        let values = self.collect(raw)?;
        self.append_values(&values, date, false)
    }

    /// Append one log row and write the updated workbook back over the template.
    pub fn append_and_persist(
        &self,
        raw: &RawInputs,
        date: NaiveDate,
    ) -> Result<Appended, ReportError> {
        let values = self.collect(raw)?;
        self.append_values(&values, date, true)
    }

    pub fn append_values(
        &self,
        values: &FormValues,
        date: NaiveDate,
        persist: bool,
    ) -> Result<Appended, ReportError> {
        let _span = tracing::info_span!("append", report = %self.binding.report_id()).entered();
        let mut doc = self.store.load(&self.template)?;
        let projection = project(values, &self.binding, &mut doc, ProjectionMode::Append)?;
        let row = projection
            .appended_row
            .ok_or_else(|| ReportError::NotAppendable {
                report: self.binding.report_id().to_string(),
            })?;
        let artifact = self.finish(&doc, date)?;
        let persisted_to = if persist {
            self.persist(&artifact.bytes)?;
            Some(self.template.clone())
        } else {
            None
        };
        Ok(Appended {
            row,
            artifact,
            persisted_to,
        })
    }

    /// Re-load the template and read its log sheet back.
    pub fn trend(&self) -> Result<Vec<TrendRow>, ReportError> {
        let log = self
            .binding
            .log()
            .ok_or_else(|| ReportError::NotAppendable {
                report: self.binding.report_id().to_string(),
            })?;
        let doc = self.store.load(&self.template)?;
        read_log_at(
            &doc,
            &log.sheet,
            log.header_row,
            &self.binding.manifest().log_schema(),
        )
    }

    fn finish(&self, doc: &TemplateDocument, date: NaiveDate) -> Result<ExportArtifact, ReportError> {
        let bytes = serialize(doc, &self.options)?;
        let manifest = self.binding.manifest();
        let file_name = render_file_name(manifest.file_name_pattern(), &manifest.report.id, date);
        Ok(ExportArtifact::new(bytes, file_name))
    }

    /// Replace the template via a sibling temp file and rename.
    ///
    /// Not coordinated across processes; concurrent writers need an external lock.
    fn persist(&self, bytes: &[u8]) -> Result<(), ReportError> {
        let dir = self
            .template
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|err| ReportError::io(dir, err))?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|err| ReportError::io(tmp.path(), err))?;
        tmp.persist(&self.template)
            .map_err(|err| ReportError::io(&self.template, err.error))?;
        self.store.invalidate(&self.template);
        tracing::info!(path = %self.template.display(), "persisted log to template");
        Ok(())
    }
}
