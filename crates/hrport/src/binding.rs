use std::collections::BTreeSet;

use hrport_common::{CellAddress, RangeAddress, SheetReference};
use hrport_spec::{Field, FieldType, Manifest, Target};
use hrport_workbook::{SpreadsheetReader, TemplateDocument};

use crate::error::ReportError;

/// Where a field's value lands.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundTarget {
    Cell(CellAddress),
    /// Single-column range receiving one line of multiline text per row.
    Lines(RangeAddress),
}

impl BoundTarget {
    pub fn sheet(&self) -> &str {
        match self {
            BoundTarget::Cell(cell) => &cell.sheet,
            BoundTarget::Lines(range) => &range.sheet,
        }
    }
}

/// A field with its targets resolved to concrete addresses.
#[derive(Debug, Clone)]
pub struct FieldBinding {
    pub field: String,
    pub label: String,
    pub value_type: FieldType,
    pub date_format: String,
    pub target: Option<BoundTarget>,
    pub label_target: Option<CellAddress>,
}

#[derive(Debug, Clone)]
pub struct LogColumnBinding {
    pub name: String,
    pub field: String,
    pub value_type: FieldType,
    pub date_format: String,
}

#[derive(Debug, Clone)]
pub struct LogBinding {
    pub sheet: String,
    pub header_row: u32,
    pub columns: Vec<LogColumnBinding>,
}

/// A manifest bound against one template: every target checked, every defined name resolved.
///
/// Binding happens once per template so layout drift fails fast instead of on first export.
#[derive(Debug, Clone)]
pub struct ReportBinding {
    manifest: Manifest,
    fields: Vec<FieldBinding>,
    log: Option<LogBinding>,
}

impl ReportBinding {
    /// Validate the manifest and resolve its targets against `template`.
    pub fn bind<R>(manifest: Manifest, template: &R) -> Result<Self, ReportError>
    where
        R: SpreadsheetReader + NameResolver,
    {
        manifest.validate()?;

        let mut fields = Vec::new();
        for field in manifest.fields() {
            let target = field
                .target
                .as_ref()
                .map(|target| bind_value_target(field, target, template))
                .transpose()?;
            let label_target = field
                .label_target
                .as_ref()
                .map(|target| bind_label_target(field, target, template))
                .transpose()?;
            fields.push(FieldBinding {
                field: field.id.clone(),
                label: field.label.clone(),
                value_type: field.value_type,
                date_format: field.date_format().to_string(),
                target,
                label_target,
            });
        }

        let log = manifest
            .log
            .as_ref()
            .map(|log| LogBinding {
                sheet: log.sheet.clone(),
                header_row: log.header_row,
                columns: log
                    .columns
                    .iter()
                    .filter_map(|column| {
                        let field = manifest.field(&column.field)?;
                        Some(LogColumnBinding {
                            name: column.name.clone(),
                            field: field.id.clone(),
                            value_type: field.value_type,
                            date_format: field.date_format().to_string(),
                        })
                    })
                    .collect(),
            });

        let binding = Self {
            manifest,
            fields,
            log,
        };
        for sheet in binding.sheets() {
            if !template.has_sheet(sheet) {
                return Err(ReportError::UnknownSheet {
                    sheet: sheet.to_string(),
                });
            }
        }
        tracing::debug!(
            report = %binding.manifest.report.id,
            fields = binding.fields.len(),
            appendable = binding.log.is_some(),
            "bound report to template"
        );
        Ok(binding)
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn report_id(&self) -> &str {
        &self.manifest.report.id
    }

    /// Bound fields in declaration order.
    pub fn fields(&self) -> &[FieldBinding] {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&FieldBinding> {
        self.fields.iter().find(|binding| binding.field == field)
    }

    pub fn log(&self) -> Option<&LogBinding> {
        self.log.as_ref()
    }

    /// Every sheet a projection of this report may touch.
    pub fn sheets(&self) -> BTreeSet<&str> {
        let mut sheets = BTreeSet::new();
        for binding in &self.fields {
            if let Some(target) = &binding.target {
                sheets.insert(target.sheet());
            }
            if let Some(label) = &binding.label_target {
                sheets.insert(label.sheet.as_str());
            }
        }
        if let Some(log) = &self.log {
            sheets.insert(log.sheet.as_str());
        }
        sheets
    }
}

/// Lookup of workbook defined names.
pub trait NameResolver {
    fn resolve_name(&self, name: &str) -> Option<SheetReference>;
}

impl NameResolver for TemplateDocument {
    fn resolve_name(&self, name: &str) -> Option<SheetReference> {
        self.resolve_defined_name(name)
    }
}

fn resolve_target<R: NameResolver>(
    field: &Field,
    target: &Target,
    template: &R,
) -> Result<SheetReference, ReportError> {
    match target {
        // shape already checked by manifest validation
        Target::A1(a1) => SheetReference::parse(&a1.a1).map_err(|err| ReportError::UnresolvedName {
            field: field.id.clone(),
            name: a1.a1.clone(),
            reason: format!("is not a valid address ({err})"),
        }),
        Target::Name(name) => {
            template
                .resolve_name(&name.name)
                .ok_or_else(|| ReportError::UnresolvedName {
                    field: field.id.clone(),
                    name: name.name.clone(),
                    reason: "is not defined in the template".to_string(),
                })
        }
    }
}

fn bind_value_target<R: NameResolver>(
    field: &Field,
    target: &Target,
    template: &R,
) -> Result<BoundTarget, ReportError> {
    match resolve_target(field, target, template)? {
        SheetReference::Cell(cell) => Ok(BoundTarget::Cell(cell)),
        SheetReference::Range(range)
            if field.value_type == FieldType::Multiline && range.width() == 1 =>
        {
            Ok(BoundTarget::Lines(range))
        }
        SheetReference::Range(range) => Err(ReportError::UnresolvedName {
            field: field.id.clone(),
            name: target_text(target),
            reason: format!("resolves to range {range}, expected a single cell"),
        }),
    }
}

fn bind_label_target<R: NameResolver>(
    field: &Field,
    target: &Target,
    template: &R,
) -> Result<CellAddress, ReportError> {
    match resolve_target(field, target, template)? {
        SheetReference::Cell(cell) => Ok(cell),
        SheetReference::Range(range) => Err(ReportError::UnresolvedName {
            field: field.id.clone(),
            name: target_text(target),
            reason: format!("resolves to range {range}, expected a single cell"),
        }),
    }
}

fn target_text(target: &Target) -> String {
    match target {
        Target::A1(a1) => a1.a1.clone(),
        Target::Name(name) => name.name.clone(),
    }
}
