use std::collections::HashSet;
use std::fmt;

use chrono::format::{Item, StrftimeItems};
use hrport_common::SheetReference;
use regex::Regex;
use schemars::JsonSchema;
use semver::Version;
use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::coerce::{coerce, is_missing};
use crate::validation::{ManifestIssue, ValidationError};

/// Current supported report manifest version.
pub const CURRENT_SPEC_VERSION: &str = "0.1.0";
/// Constant identifier for this manifest format.
pub const SPEC_IDENT: &str = "hrport";
/// File name pattern used when a report does not declare one.
pub const DEFAULT_FILE_NAME: &str = "GCC_HR_Report_{date}.xlsx";
/// Date rendering used for `date` fields without an explicit `format`.
pub const DEFAULT_DATE_FORMAT: &str = "%d-%m-%Y";

/// Canonical report manifest: the form definition plus where each value lands in the
/// template.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[schemars(
    title = "HR Report Manifest",
    description = "Declares the sections and typed fields of an HR report form and binds each field to a cell of an xlsx template."
)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Identifier for this format (must be `hrport`).
    pub spec: String,
    #[schemars(with = "String")]
    pub spec_version: SpecVersion,
    /// Human-facing metadata describing the report.
    pub report: ReportMeta,
    /// Ordered form sections.
    pub sections: Vec<Section>,
    #[serde(default)]
    /// Append-mode log definition (tracker reports).
    pub log: Option<LogSpec>,
}

impl Manifest {
    /// Construct a manifest from a YAML string slice.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize this manifest to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Canonicalise order-insensitive metadata in-place (tags are sorted and deduplicated).
    ///
    /// Sections, fields and log columns keep declaration order: it decides write order.
    pub fn normalize(&mut self) {
        if let Some(tags) = &mut self.report.tags {
            tags.sort();
            tags.dedup();
        }
    }

    /// Return a normalized copy of the manifest.
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// All fields in declaration order, across sections.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.sections.iter().flat_map(|section| section.fields.iter())
    }

    /// Locate a field by id.
    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields().find(|field| field.id == id)
    }

    /// Typed column schema of the append log, in column order.
    pub fn log_schema(&self) -> Vec<LogColumnSchema> {
        let Some(log) = &self.log else {
            return Vec::new();
        };
        log.columns
            .iter()
            .map(|column| LogColumnSchema {
                name: column.name.clone(),
                value_type: self
                    .field(&column.field)
                    .map(|field| field.value_type)
                    .unwrap_or(FieldType::Text),
            })
            .collect()
    }

    /// File name pattern for exports.
    pub fn file_name_pattern(&self) -> &str {
        self.report
            .file_name
            .as_deref()
            .unwrap_or(DEFAULT_FILE_NAME)
    }

    /// Validate the manifest and return granular issues when invariants fail.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.spec != SPEC_IDENT {
            issues.push(ManifestIssue::new(
                "spec",
                format!(
                    "expected spec identifier `{}`, found `{}`",
                    SPEC_IDENT, self.spec
                ),
            ));
        }

        let current_version = Version::parse(CURRENT_SPEC_VERSION)
            .expect("CURRENT_SPEC_VERSION must be valid semver");
        let spec_version = &self.spec_version.0;
        if spec_version.major != current_version.major {
            issues.push(ManifestIssue::new(
                "spec_version",
                format!(
                    "incompatible major version `{}` (expected `{}`)",
                    spec_version, current_version.major
                ),
            ));
        }

        let report_id_pattern = Regex::new(r"^[a-z0-9][a-z0-9-]{1,62}[a-z0-9]$")
            .expect("report id regex must compile");
        if !report_id_pattern.is_match(&self.report.id) {
            issues.push(ManifestIssue::new(
                "report.id",
                "id must be lowercase alphanumeric with hyphens, 3-64 chars".to_string(),
            ));
        }

        if let Some(pattern) = &self.report.file_name {
            if pattern.trim().is_empty() || pattern.contains(['/', '\\']) {
                issues.push(ManifestIssue::new(
                    "report.file_name",
                    "file name pattern must be a bare, non-empty file name".to_string(),
                ));
            }
        }

        let any_target = validate_sections(&self.sections, &mut issues);

        match &self.log {
            Some(log) => self.validate_log(log, &mut issues),
            None if !any_target => issues.push(ManifestIssue::new(
                "sections",
                "report must bind at least one field target or declare a log".to_string(),
            )),
            None => {}
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(issues))
        }
    }

    fn validate_log(&self, log: &LogSpec, issues: &mut Vec<ManifestIssue>) {
        if log.sheet.trim().is_empty() {
            issues.push(ManifestIssue::new(
                "log.sheet",
                "log sheet name must not be empty".to_string(),
            ));
        }
        if log.header_row == 0 {
            issues.push(ManifestIssue::new(
                "log.header_row",
                "header_row is 1-based and must be at least 1".to_string(),
            ));
        }
        if log.columns.is_empty() {
            issues.push(ManifestIssue::new(
                "log.columns",
                "log must define at least one column".to_string(),
            ));
        }
        let mut names = HashSet::new();
        for (idx, column) in log.columns.iter().enumerate() {
            if column.name.trim().is_empty() {
                issues.push(ManifestIssue::new(
                    format!("log.columns[{idx}].name"),
                    "column name must not be empty".to_string(),
                ));
            }
            if !names.insert(column.name.as_str()) {
                issues.push(ManifestIssue::new(
                    format!("log.columns[{idx}].name"),
                    format!("duplicate column name `{}`", column.name),
                ));
            }
            if self.field(&column.field).is_none() {
                issues.push(ManifestIssue::new(
                    format!("log.columns[{idx}].field"),
                    format!("column references unknown field `{}`", column.field),
                ));
            }
        }
    }
}

/// Field-level checks shared by manifests and ad-hoc form definitions: id pattern and
/// uniqueness, bounds, options, defaults, date formats and target shapes.
///
/// Returns whether any field declares a target.
pub fn validate_sections(sections: &[Section], issues: &mut Vec<ManifestIssue>) -> bool {
    let id_pattern =
        Regex::new(r"^[a-z0-9]+([_-][a-z0-9]+)*$").expect("field id regex must compile");

    if sections.iter().all(|section| section.fields.is_empty()) {
        issues.push(ManifestIssue::new(
            "sections",
            "report must define at least one field".to_string(),
        ));
    }

    let mut section_ids = HashSet::new();
    let mut field_ids = HashSet::new();
    let mut any_target = false;

    for (s_idx, section) in sections.iter().enumerate() {
        let s_path = format!("sections[{s_idx}]");
        if !id_pattern.is_match(&section.id) {
            issues.push(ManifestIssue::new(
                format!("{s_path}.id"),
                "section id must contain lowercase alphanumeric characters optionally separated by '-' or '_'"
                    .to_string(),
            ));
        }
        if !section_ids.insert(section.id.as_str()) {
            issues.push(ManifestIssue::new(
                format!("{s_path}.id"),
                format!("duplicate section id `{}`", section.id),
            ));
        }

        for (f_idx, field) in section.fields.iter().enumerate() {
            let f_path = format!("{s_path}.fields[{f_idx}]");
            if !id_pattern.is_match(&field.id) {
                issues.push(ManifestIssue::new(
                    format!("{f_path}.id"),
                    "field id must contain lowercase alphanumeric characters optionally separated by '-' or '_'"
                        .to_string(),
                ));
            }
            if !field_ids.insert(field.id.as_str()) {
                issues.push(ManifestIssue::new(
                    format!("{f_path}.id"),
                    format!("duplicate field id `{}`", field.id),
                ));
            }
            any_target |= field.target.is_some();
            validate_field(field, &f_path, issues);
        }
    }
    any_target
}

fn validate_field(field: &Field, path: &str, issues: &mut Vec<ManifestIssue>) {
    if field.label.trim().is_empty() {
        issues.push(ManifestIssue::new(
            format!("{path}.label"),
            "label must not be empty".to_string(),
        ));
    }

    let numeric = field.value_type.is_numeric();
    for (bound, value) in [("min", field.min), ("max", field.max)] {
        if let Some(value) = value {
            if !numeric {
                issues.push(ManifestIssue::new(
                    format!("{path}.{bound}"),
                    format!(
                        "bounds are only allowed on integer or decimal fields (field is `{}`)",
                        field.value_type
                    ),
                ));
            } else if !value.is_finite() {
                issues.push(ManifestIssue::new(
                    format!("{path}.{bound}"),
                    "bound must be a finite number".to_string(),
                ));
            }
        }
    }
    if let (Some(min), Some(max)) = (field.min, field.max) {
        if min > max {
            issues.push(ManifestIssue::new(
                format!("{path}.min"),
                format!("min ({min}) must not exceed max ({max})"),
            ));
        }
    }

    match (&field.options, field.value_type) {
        (None, FieldType::Choice) => issues.push(ManifestIssue::new(
            format!("{path}.options"),
            "choice fields must list their options".to_string(),
        )),
        (Some(options), FieldType::Choice) => {
            if options.is_empty() {
                issues.push(ManifestIssue::new(
                    format!("{path}.options"),
                    "choice fields must list at least one option".to_string(),
                ));
            }
            let mut seen = HashSet::new();
            for option in options {
                if !seen.insert(option.trim()) {
                    issues.push(ManifestIssue::new(
                        format!("{path}.options"),
                        format!("duplicate option `{option}`"),
                    ));
                }
            }
        }
        (Some(_), other) => issues.push(ManifestIssue::new(
            format!("{path}.options"),
            format!("options are only allowed on choice fields (field is `{other}`)"),
        )),
        (None, _) => {}
    }

    if let Some(format) = &field.format {
        if field.value_type != FieldType::Date {
            issues.push(ManifestIssue::new(
                format!("{path}.format"),
                format!(
                    "format is only allowed on date fields (field is `{}`)",
                    field.value_type
                ),
            ));
        } else if format.is_empty()
            || StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
        {
            issues.push(ManifestIssue::new(
                format!("{path}.format"),
                format!("`{format}` is not a valid strftime pattern"),
            ));
        }
    }

    if let Some(default) = &field.default {
        if !is_missing(default) {
            if let Err(violation) = coerce(field, default) {
                issues.push(ManifestIssue::new(
                    format!("{path}.default"),
                    format!("default does not satisfy the field: {violation}"),
                ));
            }
        }
    }

    if let Some(target) = &field.target {
        match target {
            Target::A1(a1) => match SheetReference::parse(&a1.a1) {
                Ok(SheetReference::Cell(_)) => {}
                Ok(SheetReference::Range(range)) => {
                    if field.value_type != FieldType::Multiline {
                        issues.push(ManifestIssue::new(
                            format!("{path}.target"),
                            "range targets are only allowed on multiline fields".to_string(),
                        ));
                    } else if range.width() != 1 {
                        issues.push(ManifestIssue::new(
                            format!("{path}.target"),
                            format!("multiline range `{range}` must be a single column"),
                        ));
                    }
                }
                Err(err) => issues.push(ManifestIssue::new(
                    format!("{path}.target.a1"),
                    err.to_string(),
                )),
            },
            Target::Name(name) => validate_name(&name.name, &format!("{path}.target"), issues),
        }
    }

    if let Some(target) = &field.label_target {
        match target {
            Target::A1(a1) => match SheetReference::parse(&a1.a1) {
                Ok(SheetReference::Cell(_)) => {}
                Ok(SheetReference::Range(_)) => issues.push(ManifestIssue::new(
                    format!("{path}.label_target"),
                    "label_target must be a single cell".to_string(),
                )),
                Err(err) => issues.push(ManifestIssue::new(
                    format!("{path}.label_target.a1"),
                    err.to_string(),
                )),
            },
            Target::Name(name) => {
                validate_name(&name.name, &format!("{path}.label_target"), issues)
            }
        }
    }
}

fn validate_name(name: &str, path: &str, issues: &mut Vec<ManifestIssue>) {
    if name.trim().is_empty() || name.contains(['!', ' ', ':']) {
        issues.push(ManifestIssue::new(
            format!("{path}.name"),
            format!("`{name}` is not a valid defined name"),
        ));
    }
}

/// Human-facing report metadata.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ReportMeta {
    /// Stable identifier (lowercase alphanumeric + hyphen).
    pub id: String,
    /// Human readable report name.
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    /// Export file name pattern; `{date}` and `{id}` are substituted.
    pub file_name: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Display grouping of fields. Sections never affect addressing.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Section {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    pub fields: Vec<Field>,
}

/// A single typed form field.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Field {
    /// Unique identifier across the whole report.
    pub id: String,
    /// Label shown to the user and written to `label_target`.
    pub label: String,
    #[serde(rename = "type")]
    pub value_type: FieldType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    /// Whether a value must be supplied (defaults to true).
    pub required: bool,
    #[serde(default)]
    /// Inclusive lower bound (numeric fields).
    pub min: Option<f64>,
    #[serde(default)]
    /// Inclusive upper bound (numeric fields).
    pub max: Option<f64>,
    #[serde(default)]
    /// Allowed values (choice fields).
    pub options: Option<Vec<String>>,
    #[serde(default)]
    /// Value used when the input omits the field.
    pub default: Option<JsonValue>,
    #[serde(default)]
    /// strftime pattern used when writing a date field.
    pub format: Option<String>,
    #[serde(default)]
    /// Cell (or single-column range for multiline text) receiving the value.
    pub target: Option<Target>,
    #[serde(default)]
    /// Cell receiving the field label.
    pub label_target: Option<Target>,
}

impl Field {
    /// Date rendering pattern for this field.
    pub fn date_format(&self) -> &str {
        self.format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT)
    }
}

fn default_true() -> bool {
    true
}

/// Declared field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    Decimal,
    Text,
    Choice,
    Date,
    Multiline,
}

impl FieldType {
    pub fn is_numeric(self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Decimal)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldType::Integer => "integer",
            FieldType::Decimal => "decimal",
            FieldType::Text => "text",
            FieldType::Choice => "choice",
            FieldType::Date => "date",
            FieldType::Multiline => "multiline",
        })
    }
}

/// Cell selector union.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Target {
    A1(TargetA1),
    Name(TargetName),
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TargetA1 {
    /// Sheet-qualified A1 reference (e.g. `'Executive Summary'!C3` or `Notes!B2:B9`).
    pub a1: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TargetName {
    /// Workbook defined name resolving to a single cell.
    pub name: String,
}

/// Append-mode log definition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LogSpec {
    /// Sheet receiving one row per submission.
    pub sheet: String,
    #[serde(default = "default_header_row")]
    /// 1-based header row; data rows start below it.
    pub header_row: u32,
    /// Columns written left to right from column A.
    pub columns: Vec<LogColumn>,
}

fn default_header_row() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LogColumn {
    /// Header text for the column.
    pub name: String,
    /// Field supplying the column value.
    pub field: String,
}

/// Column of a log sheet as seen by read-back: a name and the type used for coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogColumnSchema {
    pub name: String,
    pub value_type: FieldType,
}

impl LogColumnSchema {
    pub fn new(name: impl Into<String>, value_type: FieldType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }
}

/// Wrapper around semver::Version for serde compatibility.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SpecVersion(pub Version);

impl SpecVersion {
    pub fn new(version: Version) -> Self {
        Self(version)
    }
}

impl Serialize for SpecVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for SpecVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct VersionVisitor;

        impl<'de> Visitor<'de> for VersionVisitor {
            type Value = SpecVersion;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("semantic version string (e.g. 0.1.0)")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Version::parse(v)
                    .map(SpecVersion)
                    .map_err(|err| de::Error::custom(format!("invalid spec_version: {err}")))
            }
        }

        deserializer.deserialize_str(VersionVisitor)
    }
}

impl std::str::FromStr for Manifest {
    type Err = serde_yaml::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Manifest::from_yaml_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
spec: hrport
spec_version: "0.1.0"
report:
  id: minimal-report
  name: Minimal
sections:
  - id: summary
    label: Summary
    fields:
      - id: total_headcount
        label: Total Headcount
        type: integer
        min: 0
        target: { a1: "Summary!B3" }
"#;

    fn minimal() -> Manifest {
        Manifest::from_yaml_str(MINIMAL).expect("manifest parses")
    }

    fn paths(err: &ValidationError) -> Vec<&str> {
        err.issues().iter().map(|i| i.path.as_str()).collect()
    }

    #[test]
    fn minimal_manifest_validates() {
        let manifest = minimal();
        manifest.validate().expect("valid");
        assert_eq!(manifest.file_name_pattern(), DEFAULT_FILE_NAME);
        assert!(manifest.field("total_headcount").unwrap().required);
    }

    #[test]
    fn unknown_keys_are_rejected_at_parse_time() {
        let yaml = MINIMAL.replace("min: 0", "minimum: 0");
        assert!(Manifest::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn bounds_on_text_field_are_reported() {
        let mut manifest = minimal();
        let field = &mut manifest.sections[0].fields[0];
        field.value_type = FieldType::Text;
        let err = manifest.validate().unwrap_err();
        assert_eq!(paths(&err), vec!["sections[0].fields[0].min"]);
    }

    #[test]
    fn inverted_bounds_and_bad_default() {
        let mut manifest = minimal();
        let field = &mut manifest.sections[0].fields[0];
        field.min = Some(10.0);
        field.max = Some(5.0);
        field.default = Some(serde_json::json!(-1));
        let err = manifest.validate().unwrap_err();
        assert_eq!(
            paths(&err),
            vec!["sections[0].fields[0].min", "sections[0].fields[0].default"]
        );
    }

    #[test]
    fn range_target_requires_multiline_single_column() {
        let mut manifest = minimal();
        manifest.sections[0].fields[0].target = Some(Target::A1(TargetA1 {
            a1: "Summary!B3:B9".into(),
        }));
        let err = manifest.validate().unwrap_err();
        assert!(err.issues()[0].message.contains("multiline"));

        let field = &mut manifest.sections[0].fields[0];
        field.value_type = FieldType::Multiline;
        field.min = None;
        field.target = Some(Target::A1(TargetA1 {
            a1: "Summary!B3:C9".into(),
        }));
        let err = manifest.validate().unwrap_err();
        assert!(err.issues()[0].message.contains("single column"));
    }

    #[test]
    fn manifest_without_targets_or_log_is_rejected() {
        let mut manifest = minimal();
        manifest.sections[0].fields[0].target = None;
        let err = manifest.validate().unwrap_err();
        assert_eq!(paths(&err), vec!["sections"]);
    }

    #[test]
    fn log_schema_follows_field_types() {
        let mut manifest = minimal();
        manifest.log = Some(LogSpec {
            sheet: "Log".into(),
            header_row: 1,
            columns: vec![
                LogColumn {
                    name: "Headcount".into(),
                    field: "total_headcount".into(),
                },
                LogColumn {
                    name: "Ghost".into(),
                    field: "missing".into(),
                },
            ],
        });
        let err = manifest.validate().unwrap_err();
        assert_eq!(paths(&err), vec!["log.columns[1].field"]);
        assert_eq!(
            manifest.log_schema()[0],
            LogColumnSchema::new("Headcount", FieldType::Integer)
        );
    }

    #[test]
    fn normalize_sorts_tags_only() {
        let mut manifest = minimal();
        manifest.report.tags = Some(vec!["b".into(), "a".into(), "b".into()]);
        let normalized = manifest.normalized();
        assert_eq!(
            normalized.report.tags,
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(normalized.sections[0].fields[0].id, "total_headcount");
    }
}
