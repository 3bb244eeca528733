use std::collections::BTreeMap;

use hrport_spec::{
    Field, FieldValue, Manifest, Section, ValidationError, Violation, coerce, is_missing,
    validate_sections,
};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::ReportError;

/// Raw submission: field id to the JSON scalar the user typed.
pub type RawInputs = BTreeMap<String, JsonValue>;

/// The fields of one report, grouped into sections, immutable once defined.
#[derive(Debug, Clone)]
pub struct FormModel {
    sections: Vec<Section>,
}

impl FormModel {
    /// Define a form from sections, checking field ids and per-field consistency.
    pub fn define(sections: Vec<Section>) -> Result<Self, ReportError> {
        let mut issues = Vec::new();
        validate_sections(&sections, &mut issues);
        if !issues.is_empty() {
            return Err(ValidationError::new(issues).into());
        }
        Ok(Self { sections })
    }

    /// Form of an already validated manifest.
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self {
            sections: manifest.sections.clone(),
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.sections.iter().flat_map(|section| section.fields.iter())
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields().find(|field| field.id == id)
    }

    /// Coerce a raw submission into typed values.
    ///
    /// Fields are checked in declaration order and the first violation is returned. Missing
    /// fields fall back to their default; missing optional fields become
    /// [`FieldValue::Empty`]. Keys that name no field are rejected.
    pub fn collect(&self, raw: &RawInputs) -> Result<FormValues, ReportError> {
        let mut values = BTreeMap::new();
        for field in self.fields() {
            let value = collect_field(field, raw.get(&field.id)).map_err(|violation| {
                ReportError::Validation {
                    field: field.id.clone(),
                    violation,
                }
            })?;
            values.insert(field.id.clone(), value);
        }

        if let Some(unknown) = raw.keys().find(|key| !values.contains_key(key.as_str())) {
            return Err(ReportError::Validation {
                field: unknown.clone(),
                violation: Violation::UnknownField,
            });
        }

        tracing::debug!(fields = values.len(), "collected form values");
        Ok(FormValues { values })
    }
}

fn collect_field(field: &Field, raw: Option<&JsonValue>) -> Result<FieldValue, Violation> {
    match raw {
        Some(value) if !is_missing(value) => coerce(field, value),
        _ => match &field.default {
            Some(default) if !is_missing(default) => coerce(field, default),
            _ if field.required => Err(Violation::Missing),
            _ => Ok(FieldValue::Empty),
        },
    }
}

/// Typed values of one submission, keyed by field id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormValues {
    values: BTreeMap<String, FieldValue>,
}

impl FormValues {
    /// Value of `id`; fields absent from the form read as [`FieldValue::Empty`].
    pub fn get(&self, id: &str) -> &FieldValue {
        self.values.get(id).unwrap_or(&FieldValue::Empty)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(id, value)| (id.as_str(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn summary_form() -> FormModel {
        let manifest = hrport_spec::bundled("executive-summary").unwrap().unwrap();
        FormModel::from_manifest(&manifest)
    }

    fn raw(pairs: &[(&str, JsonValue)]) -> RawInputs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn collects_typed_values_and_defaults() {
        let form = summary_form();
        let values = form
            .collect(&raw(&[
                ("report_date", json!("30-06-2025")),
                ("total_headcount", json!("1,200")),
            ]))
            .unwrap();

        assert_eq!(values.get("report_period"), &FieldValue::Text("Q2 2025".into()));
        assert_eq!(
            values.get("report_date"),
            &FieldValue::Date(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap())
        );
        assert_eq!(values.get("total_headcount"), &FieldValue::Integer(1200));
        assert_eq!(values.get("attrition_rate_ytd"), &FieldValue::Empty);
        assert_eq!(values.len(), 5);
    }

    #[test]
    fn negative_headcount_names_the_field() {
        let form = summary_form();
        let err = form
            .collect(&raw(&[
                ("report_date", json!("2025-06-30")),
                ("total_headcount", json!(-5)),
            ]))
            .unwrap_err();
        match err {
            ReportError::Validation { field, violation } => {
                assert_eq!(field, "total_headcount");
                assert!(matches!(violation, Violation::BelowMinimum { min, .. } if min == 0.0));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn first_violation_in_declaration_order_wins() {
        let form = summary_form();
        let err = form
            .collect(&raw(&[("total_headcount", json!("lots"))]))
            .unwrap_err();
        // report_date is declared before total_headcount and is missing
        assert!(matches!(
            err,
            ReportError::Validation { ref field, violation: Violation::Missing } if field == "report_date"
        ));
    }

    #[test]
    fn blank_input_is_missing_and_unknown_keys_are_rejected() {
        let form = summary_form();
        let err = form
            .collect(&raw(&[
                ("report_date", json!("2025-06-30")),
                ("total_headcount", json!("  ")),
            ]))
            .unwrap_err();
        assert!(matches!(
            err,
            ReportError::Validation { violation: Violation::Missing, .. }
        ));

        let err = form
            .collect(&raw(&[
                ("report_date", json!("2025-06-30")),
                ("total_headcount", json!(10)),
                ("headcount", json!(10)),
            ]))
            .unwrap_err();
        assert!(matches!(
            err,
            ReportError::Validation { ref field, violation: Violation::UnknownField } if field == "headcount"
        ));
    }

    #[test]
    fn define_rejects_inconsistent_fields() {
        let yaml = r#"
- id: main
  label: Main
  fields:
    - { id: headcount, label: Headcount, type: text, min: 0 }
    - { id: headcount, label: Again, type: integer }
"#;
        let sections: Vec<Section> = serde_yaml::from_str(yaml).unwrap();
        let err = FormModel::define(sections).unwrap_err();
        match err {
            ReportError::Manifest(issues) => {
                let paths: Vec<_> = issues.issues().iter().map(|i| i.path.as_str()).collect();
                assert_eq!(paths, ["sections[0].fields[0].min", "sections[0].fields[1].id"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
