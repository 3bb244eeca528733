use chrono::{TimeZone, Utc};
use hrport_common::CellValue;
use hrport_testkit::{
    SUMMARY_SHEET, build_workbook, executive_summary_template, put_number, put_text,
};
use hrport_workbook::{
    ExportOptions, SpreadsheetReader, SpreadsheetWriter, TemplateDocument, TemplateError,
    TemplateStore, serialize,
};

#[test]
fn loads_hand_out_independent_copies() {
    let template = executive_summary_template();
    let store = TemplateStore::new();

    let mut first = store.load(template.path()).unwrap();
    first
        .write_cell(SUMMARY_SHEET, 3, 3, &CellValue::Number(1200.0))
        .unwrap();

    let second = store.load(template.path()).unwrap();
    assert_eq!(second.read_cell(SUMMARY_SHEET, 3, 3).unwrap(), CellValue::Empty);
    assert_eq!(
        second.read_cell(SUMMARY_SHEET, 3, 2).unwrap(),
        CellValue::Text("Total Headcount".into())
    );
    assert_eq!(store.stats().misses, 1);
    assert_eq!(store.stats().hits, 1);
}

#[test]
fn invalidate_forces_a_reparse() {
    let template = executive_summary_template();
    let store = TemplateStore::new();
    store.load(template.path()).unwrap();

    store.invalidate(template.path());
    store.load(template.path()).unwrap();
    assert_eq!(store.stats().misses, 2);

    let uncached = TemplateStore::uncached();
    uncached.load(template.path()).unwrap();
    uncached.load(template.path()).unwrap();
    assert_eq!(uncached.stats().hits, 0);
}

#[test]
fn rewritten_template_is_picked_up() {
    let template = executive_summary_template();
    let store = TemplateStore::new();
    let doc = store.load(template.path()).unwrap();
    assert_eq!(doc.max_used_row(SUMMARY_SHEET).unwrap(), 5);

    // grow the file so its length changes even if the mtime resolution is coarse
    let mut book = template.reopen();
    for row in 6..=40 {
        put_number(&mut book, SUMMARY_SHEET, row, 3, row as f64);
    }
    umya_spreadsheet::writer::xlsx::write(&book, template.path()).unwrap();

    let doc = store.load(template.path()).unwrap();
    assert_eq!(doc.max_used_row(SUMMARY_SHEET).unwrap(), 40);
}

#[test]
fn invalidate_picks_up_an_in_place_rewrite() {
    let template = build_workbook(|book| {
        put_text(book, "Data", 1, 1, "draft");
    });
    let store = TemplateStore::new();
    assert_eq!(
        store.load(template.path()).unwrap().read_cell("Data", 1, 1).unwrap(),
        CellValue::Text("draft".into())
    );

    let mut book = template.reopen();
    put_text(&mut book, "Data", 1, 1, "final");
    umya_spreadsheet::writer::xlsx::write(&book, template.path()).unwrap();

    store.invalidate(template.path());
    assert_eq!(
        store.load(template.path()).unwrap().read_cell("Data", 1, 1).unwrap(),
        CellValue::Text("final".into())
    );
}

#[test]
fn missing_and_corrupt_files() {
    let store = TemplateStore::new();
    let dir = tempfile::tempdir().unwrap();

    let missing = dir.path().join("missing.xlsx");
    assert!(!store.exists(&missing));
    assert!(matches!(
        store.load(&missing),
        Err(TemplateError::NotFound { .. })
    ));

    let corrupt = dir.path().join("corrupt.xlsx");
    std::fs::write(&corrupt, b"plain text, not a workbook").unwrap();
    assert!(store.exists(&corrupt));
    assert!(matches!(
        store.load(&corrupt),
        Err(TemplateError::Corrupt { .. })
    ));
    assert!(matches!(
        store.load_bytes(b"nope"),
        Err(TemplateError::Corrupt { .. })
    ));
}

#[test]
fn serialization_is_deterministic_and_reparses() {
    let template = build_workbook(|book| {
        put_number(book, "Data", 1, 1, 42.0);
    });
    let store = TemplateStore::new();
    let mut doc = store.load(template.path()).unwrap();
    doc.write_cell("Data", 2, 1, &CellValue::Text("written".into()))
        .unwrap();

    let options = ExportOptions {
        fixed_timestamp: Some(Utc.with_ymd_and_hms(2025, 6, 30, 9, 0, 0).unwrap()),
    };
    let first = serialize(&doc, &options).unwrap();
    let second = serialize(&doc, &options).unwrap();
    assert_eq!(first, second);

    let reparsed = TemplateDocument::from_bytes(&first).unwrap();
    assert_eq!(reparsed.read_cell("Data", 1, 1).unwrap(), CellValue::Number(42.0));
    assert_eq!(
        reparsed.read_cell("Data", 2, 1).unwrap(),
        CellValue::Text("written".into())
    );
    assert_eq!(
        reparsed.book().get_properties().get_modified(),
        "2025-06-30T09:00:00Z"
    );

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(first)).unwrap();
    for index in 0..archive.len() {
        let entry = archive.by_index(index).unwrap();
        assert_eq!(entry.last_modified().year(), 1980, "{}", entry.name());
    }
}
