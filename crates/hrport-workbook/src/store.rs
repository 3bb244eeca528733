use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use parking_lot::Mutex;
use umya_spreadsheet::{Spreadsheet, reader::xlsx};

use crate::document::TemplateDocument;
use crate::error::TemplateError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub hits: u64,
    pub misses: u64,
    pub parse_time_ms: u64,
}

/// File identity used to decide whether a cached parse is still valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

struct CachedTemplate {
    stamp: FileStamp,
    book: Arc<Spreadsheet>,
}

/// Loads xlsx templates and hands out independent in-memory copies.
///
/// Parsed workbooks are cached per path and reused while the file's modification time and
/// length are unchanged. Callers always receive an owned clone, so mutating a document never
/// leaks into later loads.
///
/// The (mtime, length) key cannot see an external rewrite that keeps the same length within
/// the filesystem's mtime granularity; such a rewrite keeps serving the old parse until
/// [`invalidate`](Self::invalidate) is called or a [`uncached`](Self::uncached) store is used.
/// The tracker persist path in `hrport` invalidates after every rewrite.
pub struct TemplateStore {
    cache: Mutex<HashMap<PathBuf, CachedTemplate>>,
    stats: Mutex<StoreStats>,
    caching: bool,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateStore {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            stats: Mutex::new(StoreStats::default()),
            caching: true,
        }
    }

    /// A store that re-parses the template on every load.
    pub fn uncached() -> Self {
        Self {
            caching: false,
            ..Self::new()
        }
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        path.as_ref().is_file()
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<TemplateDocument, TemplateError> {
        let path = path.as_ref();
        let metadata = match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => {
                return Err(TemplateError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(TemplateError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(err) => return Err(TemplateError::io(path, err)),
        };
        let stamp = FileStamp {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        };

        if self.caching {
            let cache = self.cache.lock();
            if let Some(entry) = cache.get(path) {
                // an unknown mtime never matches, so such files are always re-read
                if entry.stamp == stamp && stamp.modified.is_some() {
                    self.stats.lock().hits += 1;
                    tracing::debug!(path = %path.display(), "template cache hit");
                    return Ok(TemplateDocument::from_parts(
                        (*entry.book).clone(),
                        Some(path.to_path_buf()),
                    ));
                }
            }
        }

        let start = Instant::now();
        let book = xlsx::read(path).map_err(|err| TemplateError::Corrupt {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let elapsed = start.elapsed().as_millis() as u64;
        {
            let mut stats = self.stats.lock();
            stats.misses += 1;
            stats.parse_time_ms += elapsed;
        }
        tracing::debug!(
            path = %path.display(),
            sheets = book.get_sheet_count(),
            elapsed_ms = elapsed,
            "parsed template"
        );

        let book = Arc::new(book);
        if self.caching {
            self.cache.lock().insert(
                path.to_path_buf(),
                CachedTemplate {
                    stamp,
                    book: Arc::clone(&book),
                },
            );
        }
        Ok(TemplateDocument::from_parts(
            Arc::unwrap_or_clone(book),
            Some(path.to_path_buf()),
        ))
    }

    /// Parse a template supplied as bytes. Never cached.
    pub fn load_bytes(&self, bytes: &[u8]) -> Result<TemplateDocument, TemplateError> {
        let book = xlsx::read_reader(Cursor::new(bytes), true).map_err(|err| {
            TemplateError::Corrupt {
                path: PathBuf::from("<memory>"),
                message: err.to_string(),
            }
        })?;
        Ok(TemplateDocument::from_parts(book, None))
    }

    /// Drop any cached parse of `path`, e.g. after the file was rewritten in place.
    pub fn invalidate(&self, path: impl AsRef<Path>) {
        if self.cache.lock().remove(path.as_ref()).is_some() {
            tracing::debug!(path = %path.as_ref().display(), "template cache invalidated");
        }
    }

    pub fn stats(&self) -> StoreStats {
        *self.stats.lock()
    }
}
