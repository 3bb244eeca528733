use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use hrport::{
    ExportOptions, FieldValue, FormModel, Manifest, ProjectionMode, RawInputs, ReportBinding,
    ReportError, ReportSession, TemplateDocument, TemplateStore, Violation, XLSX_CONTENT_TYPE,
    project,
};
use hrport_common::CellValue;
use hrport_testkit::{
    SUMMARY_SHEET, build_workbook, executive_summary_template, hr_metrics_template, put_text,
};
use hrport_workbook::SpreadsheetReader;
use serde_json::json;

const HEADCOUNT_ONLY: &str = r#"
spec: hrport
spec_version: "0.1.0"
report:
  id: headcount-only
  name: Headcount
sections:
  - id: summary
    label: Summary
    fields:
      - id: total_headcount
        label: Total Headcount
        type: integer
        min: 0
        target: { a1: "'Executive Summary'!B3" }
"#;

fn inputs(pairs: serde_json::Value) -> RawInputs {
    serde_json::from_value(pairs).unwrap()
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
}

fn bundled(id: &str) -> Manifest {
    hrport_spec::bundled(id).unwrap().unwrap()
}

#[test]
fn headcount_lands_in_its_target_cell() {
    let template = executive_summary_template();
    let manifest = Manifest::from_yaml_str(HEADCOUNT_ONLY).unwrap();
    let session =
        ReportSession::open(Arc::new(TemplateStore::new()), template.path(), manifest).unwrap();

    let artifact = session
        .export(&inputs(json!({ "total_headcount": 1200 })), date())
        .unwrap();

    let doc = TemplateDocument::from_bytes(&artifact.bytes).unwrap();
    assert_eq!(
        doc.read_cell(SUMMARY_SHEET, 3, 2).unwrap(),
        CellValue::Number(1200.0)
    );
    assert_eq!(artifact.content_type, XLSX_CONTENT_TYPE);
    assert_eq!(artifact.file_name, "GCC_HR_Report_20250630.xlsx");
}

#[test]
fn export_round_trips_every_written_value() {
    let template = executive_summary_template();
    let session = ReportSession::open(
        Arc::new(TemplateStore::new()),
        template.path(),
        bundled("executive-summary"),
    )
    .unwrap();

    let artifact = session
        .export(
            &inputs(json!({
                "report_period": "Q2 2025",
                "report_date": "2025-06-30",
                "total_headcount": "1,450",
                "attrition_rate_ytd": "11.2%",
                "key_highlights": "Hiring ahead of plan\nTwo new leadership hires",
            })),
            date(),
        )
        .unwrap();

    let doc = TemplateDocument::from_bytes(&artifact.bytes).unwrap();
    let cell = |row, col| doc.read_cell(SUMMARY_SHEET, row, col).unwrap();
    assert_eq!(cell(1, 3), CellValue::Text("Q2 2025".into()));
    assert_eq!(cell(2, 3), CellValue::Text("30-06-2025".into()));
    assert_eq!(cell(3, 3), CellValue::Number(1450.0));
    assert_eq!(cell(4, 3), CellValue::Text("11.2%".into()));
    assert_eq!(
        cell(5, 3),
        CellValue::Text("Hiring ahead of plan\nTwo new leadership hires".into())
    );
    // labels are refreshed from the manifest
    assert_eq!(cell(2, 2), CellValue::Text("Reporting Date".into()));
    assert_eq!(cell(4, 2), CellValue::Text("Total Attrition Rate (YTD)".into()));
}

#[test]
fn optional_empty_fields_clear_their_target() {
    let template = build_workbook(|book| {
        put_text(book, SUMMARY_SHEET, 3, 2, "Total Headcount");
        put_text(book, SUMMARY_SHEET, 4, 3, "TBD");
        put_text(book, SUMMARY_SHEET, 5, 3, "last quarter's notes");
    });
    let session = ReportSession::open(
        Arc::new(TemplateStore::new()),
        template.path(),
        bundled("executive-summary"),
    )
    .unwrap();

    let artifact = session
        .export(
            &inputs(json!({ "report_date": "30/06/2025", "total_headcount": 10 })),
            date(),
        )
        .unwrap();
    let doc = TemplateDocument::from_bytes(&artifact.bytes).unwrap();
    assert_eq!(doc.read_cell(SUMMARY_SHEET, 4, 3).unwrap(), CellValue::Empty);
    assert_eq!(doc.read_cell(SUMMARY_SHEET, 5, 3).unwrap(), CellValue::Empty);
    // the default still applies
    assert_eq!(
        doc.read_cell(SUMMARY_SHEET, 1, 3).unwrap(),
        CellValue::Text("Q2 2025".into())
    );
}

#[test]
fn out_of_bounds_input_is_rejected_before_any_write() {
    let template = executive_summary_template();
    let manifest = Manifest::from_yaml_str(HEADCOUNT_ONLY).unwrap();
    let session =
        ReportSession::open(Arc::new(TemplateStore::new()), template.path(), manifest).unwrap();

    let err = session
        .export(&inputs(json!({ "total_headcount": -1 })), date())
        .unwrap_err();
    match err {
        ReportError::Validation { field, violation } => {
            assert_eq!(field, "total_headcount");
            assert_eq!(
                violation,
                Violation::BelowMinimum {
                    value: -1.0,
                    min: 0.0
                }
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn headcounts_beyond_exact_cell_precision_are_rejected() {
    let template = executive_summary_template();
    let manifest = Manifest::from_yaml_str(HEADCOUNT_ONLY).unwrap();
    let session =
        ReportSession::open(Arc::new(TemplateStore::new()), template.path(), manifest).unwrap();

    let err = session
        .export(&inputs(json!({ "total_headcount": 9_007_199_254_740_993_i64 })), date())
        .unwrap_err();
    assert!(matches!(
        err,
        ReportError::Validation { ref field, violation: Violation::NotExact { .. } }
            if field == "total_headcount"
    ));

    let artifact = session
        .export(&inputs(json!({ "total_headcount": 9_007_199_254_740_992_i64 })), date())
        .unwrap();
    let doc = TemplateDocument::from_bytes(&artifact.bytes).unwrap();
    assert_eq!(
        doc.read_cell(SUMMARY_SHEET, 3, 2).unwrap(),
        CellValue::Number(9_007_199_254_740_992.0)
    );
}

#[test]
fn repeated_exports_are_byte_identical() {
    let template = executive_summary_template();
    let store = Arc::new(TemplateStore::new());
    let session = ReportSession::open(store.clone(), template.path(), bundled("executive-summary"))
        .unwrap()
        .with_options(ExportOptions {
            fixed_timestamp: Some(Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap()),
        });
    let raw = inputs(json!({ "report_date": "2025-06-30", "total_headcount": 1200 }));

    let first = session.export(&raw, date()).unwrap();
    let second = session.export(&raw, date()).unwrap();
    assert_eq!(first.bytes, second.bytes);

    // open + two exports: one parse, the rest served from the cache
    let stats = store.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
}

#[test]
fn exports_never_mutate_the_cached_template() {
    let template = executive_summary_template();
    let store = Arc::new(TemplateStore::new());
    let session = ReportSession::open(store.clone(), template.path(), bundled("executive-summary"))
        .unwrap();
    session
        .export(
            &inputs(json!({ "report_date": "2025-06-30", "total_headcount": 1200 })),
            date(),
        )
        .unwrap();

    let fresh = store.load(template.path()).unwrap();
    assert_eq!(fresh.read_cell(SUMMARY_SHEET, 3, 3).unwrap(), CellValue::Empty);
}

#[test]
fn multiline_text_fills_the_range_and_folds_surplus_lines() {
    let template = hr_metrics_template();
    let store = TemplateStore::new();
    let manifest = bundled("hr-metrics");
    let doc = store.load(template.path()).unwrap();
    let binding = ReportBinding::bind(manifest, &doc).unwrap();
    let form = FormModel::from_manifest(binding.manifest());

    let highlights: Vec<String> = (1..=10).map(|i| format!("Highlight {i}")).collect();
    let values = form
        .collect(&inputs(json!({
            "report_date": "2025-06-30",
            "total_headcount": 1200,
            "attrition_rate_ytd": 11.5,
            "permanent_employees": 1100,
            "women_pct": "38.5",
            "key_highlights": highlights.join("\r\n"),
            "compliance_notes": "All filings on time\nNo open findings",
        })))
        .unwrap();

    let mut doc = doc;
    project(&values, &binding, &mut doc, ProjectionMode::Overwrite).unwrap();

    let summary = |row| doc.read_cell(SUMMARY_SHEET, row, 2).unwrap();
    assert_eq!(summary(7), CellValue::Text("Highlight 1".into()));
    assert_eq!(summary(13), CellValue::Text("Highlight 7".into()));
    assert_eq!(
        summary(14),
        CellValue::Text("Highlight 8\nHighlight 9\nHighlight 10".into())
    );

    assert_eq!(
        doc.read_cell("Compliance", 6, 2).unwrap(),
        CellValue::Text("All filings on time".into())
    );
    assert_eq!(
        doc.read_cell("Compliance", 7, 2).unwrap(),
        CellValue::Text("No open findings".into())
    );
    assert_eq!(doc.read_cell("Compliance", 8, 2).unwrap(), CellValue::Empty);
    assert_eq!(
        doc.read_cell("Compliance", 4, 2).unwrap(),
        CellValue::Text("Compliant".into())
    );
    assert_eq!(
        doc.read_cell("Diversity", 2, 2).unwrap(),
        CellValue::Number(38.5)
    );
    assert_eq!(values.get("contract_employees"), &FieldValue::Integer(0));
}

#[test]
fn binding_fails_fast_on_missing_sheets() {
    let template = build_workbook(|book| {
        book.new_sheet("Summary").unwrap();
    });
    let err = ReportSession::open(
        Arc::new(TemplateStore::new()),
        template.path(),
        bundled("executive-summary"),
    )
    .err()
    .expect("binding should fail");
    assert!(matches!(err, ReportError::UnknownSheet { sheet } if sheet == SUMMARY_SHEET));
}

#[test]
fn missing_and_corrupt_templates_are_distinguished() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.xlsx");
    let err = ReportSession::open(
        Arc::new(TemplateStore::new()),
        &missing,
        bundled("executive-summary"),
    )
    .err()
    .expect("missing template");
    assert!(matches!(err, ReportError::TemplateNotFound { .. }));

    let corrupt = dir.path().join("corrupt.xlsx");
    std::fs::write(&corrupt, b"this is not a zip archive").unwrap();
    let err = ReportSession::open(
        Arc::new(TemplateStore::new()),
        &corrupt,
        bundled("executive-summary"),
    )
    .err()
    .expect("corrupt template");
    assert!(matches!(err, ReportError::TemplateCorrupt { .. }));
}

#[test]
fn defined_names_resolve_to_cells_at_bind_time() {
    const NAMED: &str = r#"
spec: hrport
spec_version: "0.1.0"
report:
  id: named-target
  name: Named
sections:
  - id: summary
    label: Summary
    fields:
      - id: total_headcount
        label: Total Headcount
        type: integer
        target: { name: HeadcountCell }
"#;
    let template = build_workbook(|book| {
        book.new_sheet("Summary").unwrap();
    });
    let store = TemplateStore::new();
    let mut doc = store.load(template.path()).unwrap();
    doc.book_mut()
        .get_sheet_by_name_mut("Summary")
        .unwrap()
        .add_defined_name("HeadcountCell", "Summary!$D$4")
        .unwrap();

    let manifest = Manifest::from_yaml_str(NAMED).unwrap();
    let binding = ReportBinding::bind(manifest.clone(), &doc).unwrap();
    let values = FormModel::from_manifest(&manifest)
        .collect(&inputs(json!({ "total_headcount": 12 })))
        .unwrap();
    project(&values, &binding, &mut doc, ProjectionMode::Overwrite).unwrap();
    assert_eq!(doc.read_cell("Summary", 4, 4).unwrap(), CellValue::Number(12.0));

    let plain = store.load(template.path()).unwrap();
    let err = ReportBinding::bind(manifest, &plain).unwrap_err();
    assert!(matches!(err, ReportError::UnresolvedName { name, .. } if name == "HeadcountCell"));
}
