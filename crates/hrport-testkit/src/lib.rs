//! Workbook fixtures shared by the hrport test suites.
//!
//! Fixtures are written to a temporary directory that lives as long as the returned
//! [`Fixture`]; the layouts mirror the bundled report manifests.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
pub use umya_spreadsheet::Spreadsheet;

pub const SUMMARY_SHEET: &str = "Executive Summary";
pub const TRACKER_SHEET: &str = "Tracker Log";

pub const TRACKER_HEADERS: [&str; 8] = [
    "Period",
    "Period End",
    "Headcount",
    "Joiners",
    "Exits",
    "Attrition %",
    "Open Positions",
    "Engagement",
];

/// A workbook written to disk inside its own temporary directory.
pub struct Fixture {
    dir: TempDir,
    path: PathBuf,
}

impl Fixture {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Re-read the workbook from disk, e.g. after a persist.
    pub fn reopen(&self) -> Spreadsheet {
        umya_spreadsheet::reader::xlsx::read(&self.path).unwrap()
    }
}

/// Build a workbook that starts with no sheets, then write it to `name` in a fresh temp dir.
pub fn build_named<F>(name: &str, build: F) -> Fixture
where
    F: FnOnce(&mut Spreadsheet),
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    let mut book = umya_spreadsheet::new_file_empty_worksheet();
    build(&mut book);
    if book.get_sheet_count() == 0 {
        book.new_sheet("Sheet1").unwrap();
    }
    umya_spreadsheet::writer::xlsx::write(&book, &path).unwrap();
    Fixture { dir, path }
}

pub fn build_workbook<F>(build: F) -> Fixture
where
    F: FnOnce(&mut Spreadsheet),
{
    build_named("template.xlsx", build)
}

/// Set text at `(row, col)`; both 1-based.
pub fn put_text(book: &mut Spreadsheet, sheet: &str, row: u32, col: u32, text: &str) {
    sheet_mut(book, sheet)
        .get_cell_mut((col, row))
        .set_value_string(text);
}

pub fn put_number(book: &mut Spreadsheet, sheet: &str, row: u32, col: u32, value: f64) {
    sheet_mut(book, sheet)
        .get_cell_mut((col, row))
        .set_value_number(value);
}

fn sheet_mut<'a>(book: &'a mut Spreadsheet, sheet: &str) -> &'a mut umya_spreadsheet::Worksheet {
    if book.get_sheet_by_name(sheet).is_none() {
        book.new_sheet(sheet).unwrap();
    }
    book.get_sheet_by_name_mut(sheet).unwrap()
}

/// The "Executive Summary" one-pager: labels in column B, blank value cells in column C.
pub fn executive_summary_template() -> Fixture {
    build_named("GCC_HR_Metrics_Template.xlsx", |book| {
        put_text(book, SUMMARY_SHEET, 1, 2, "Report Period");
        put_text(book, SUMMARY_SHEET, 2, 2, "Report Date");
        put_text(book, SUMMARY_SHEET, 3, 2, "Total Headcount");
        put_text(book, SUMMARY_SHEET, 4, 2, "Attrition Rate (YTD)");
        put_text(book, SUMMARY_SHEET, 5, 2, "Key Highlights");
    })
}

/// Sheets of the full metrics pack, each with a title in `A1`.
pub fn hr_metrics_template() -> Fixture {
    build_named("GCC_HR_Metrics_Pack.xlsx", |book| {
        for sheet in [
            SUMMARY_SHEET,
            "Headcount",
            "Attrition",
            "Diversity",
            "Engagement",
            "Compliance",
        ] {
            put_text(book, sheet, 1, 1, sheet);
        }
    })
}

/// Tracker workbook with the header row filled and `rows` already logged below it.
pub fn tracker_template(rows: &[&[TrackerCell]]) -> Fixture {
    build_named("GCC_HR_Tracker.xlsx", |book| {
        for (idx, header) in TRACKER_HEADERS.iter().enumerate() {
            put_text(book, TRACKER_SHEET, 1, idx as u32 + 1, header);
        }
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let (row_num, col_num) = (r as u32 + 2, c as u32 + 1);
                match cell {
                    TrackerCell::Text(s) => put_text(book, TRACKER_SHEET, row_num, col_num, s),
                    TrackerCell::Number(n) => {
                        put_number(book, TRACKER_SHEET, row_num, col_num, *n)
                    }
                    TrackerCell::Blank => {}
                }
            }
        }
    })
}

/// Tracker workbook whose log sheet exists but is completely blank.
pub fn blank_tracker_template() -> Fixture {
    build_named("GCC_HR_Tracker.xlsx", |book| {
        book.new_sheet(TRACKER_SHEET).unwrap();
    })
}

#[derive(Clone, Debug)]
pub enum TrackerCell {
    Text(&'static str),
    Number(f64),
    Blank,
}
