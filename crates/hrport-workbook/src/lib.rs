//! Template handling for the report pipeline: loading xlsx templates with a modification-aware
//! cache, reading and writing cells on in-memory copies, and turning a copy back into
//! reproducible xlsx bytes.

pub mod document;
pub mod error;
pub mod serialize;
pub mod store;
pub mod traits;

pub use document::TemplateDocument;
pub use error::TemplateError;
pub use serialize::{ExportOptions, serialize};
pub use store::{StoreStats, TemplateStore};
pub use traits::{SheetData, SpreadsheetReader, SpreadsheetWriter};
