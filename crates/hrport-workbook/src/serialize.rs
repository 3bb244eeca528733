//! Workbook to bytes, with deterministic container metadata.

use std::io::{Cursor, Read, Write};

use chrono::{DateTime, Utc};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::document::TemplateDocument;
use crate::error::TemplateError;

#[derive(Clone, Debug, Default)]
pub struct ExportOptions {
    /// When set, document properties (created/modified) are stamped with this instant
    /// before serialization. Left unset, the template's own properties are kept.
    pub fixed_timestamp: Option<DateTime<Utc>>,
}

/// Serialize a document to xlsx bytes.
///
/// The xlsx writer stamps archive entries with the wall clock, so the archive is re-packed
/// with a fixed entry time and a stable compression method. Serializing an unchanged
/// document twice yields identical bytes.
pub fn serialize(doc: &TemplateDocument, options: &ExportOptions) -> Result<Vec<u8>, TemplateError> {
    let raw = if let Some(at) = options.fixed_timestamp {
        let mut stamped = doc.clone();
        stamped.stamp_properties(at);
        write_raw(&stamped)?
    } else {
        write_raw(doc)?
    };
    repack(&raw)
}

fn write_raw(doc: &TemplateDocument) -> Result<Vec<u8>, TemplateError> {
    let mut cursor = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(doc.book(), &mut cursor)
        .map_err(|err| TemplateError::Serialization(err.to_string()))?;
    Ok(cursor.into_inner())
}

fn repack(raw: &[u8]) -> Result<Vec<u8>, TemplateError> {
    let zip_err = |err: zip::result::ZipError| TemplateError::Serialization(err.to_string());
    let io_err = |err: std::io::Error| TemplateError::Serialization(err.to_string());

    let mut archive = ZipArchive::new(Cursor::new(raw)).map_err(zip_err)?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(raw.len())));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let mut buf = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(zip_err)?;
        let name = entry.name().to_string();
        if entry.is_dir() {
            writer.add_directory(name, options).map_err(zip_err)?;
            continue;
        }
        buf.clear();
        entry.read_to_end(&mut buf).map_err(io_err)?;
        writer.start_file(name, options).map_err(zip_err)?;
        writer.write_all(&buf).map_err(io_err)?;
    }
    let cursor = writer.finish().map_err(zip_err)?;
    Ok(cursor.into_inner())
}
