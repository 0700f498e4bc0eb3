use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;
use tracing::{debug, info};

use super::line_items::{EquipmentRow, LaborRow, SupplyRow};
use super::Loaded;
use crate::error::{Result, ReviewError};
use crate::metrics::SourceMetrics;
use crate::types::{CodeRecord, RvuRecord};

/// Process-wide memo of loaded source tables
pub static SOURCE_CACHE: Lazy<SourceCache> = Lazy::new(SourceCache::new);

/// Modification time and length; a change in either means the file was replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl FileStamp {
    fn of(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ReviewError::SourceMissing {
                path: path.to_path_buf(),
            },
            _ => ReviewError::Io(e),
        })?;
        Ok(Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }
}

struct CacheEntry<T> {
    stamp: FileStamp,
    table: Arc<T>,
}

/// Memo of one table type keyed by path
pub struct TableCache<T> {
    entries: RwLock<HashMap<PathBuf, CacheEntry<T>>>,
}

impl<T> Default for TableCache<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> TableCache<T> {
    /// Return the cached table for `path`, loading it when absent or when the file changed.
    pub fn get_or_load(&self, path: &Path, load: impl FnOnce(&Path) -> Result<T>) -> Result<Arc<T>> {
        let stamp = FileStamp::of(path)?;

        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = entries.get(path) {
                if entry.stamp == stamp {
                    debug!(path = %path.display(), "Source cache hit");
                    SourceMetrics::record_cache_hit();
                    return Ok(Arc::clone(&entry.table));
                }
                info!(path = %path.display(), "Source file changed, reloading");
            }
        }

        let table = Arc::new(load(path)?);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            path.to_path_buf(),
            CacheEntry {
                stamp,
                table: Arc::clone(&table),
            },
        );
        Ok(table)
    }

    pub fn invalidate(&self, path: &Path) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(path).is_some()
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One memo per source table type. Tables are immutable once loaded and are
/// shared out behind `Arc`.
#[derive(Default)]
pub struct SourceCache {
    pub reference: TableCache<Loaded<CodeRecord>>,
    pub supply: TableCache<Loaded<SupplyRow>>,
    pub equipment: TableCache<Loaded<EquipmentRow>>,
    pub labor: TableCache<Loaded<LaborRow>>,
    pub rvu: TableCache<Loaded<RvuRecord>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any cached table loaded from `path`
    pub fn invalidate(&self, path: &Path) -> bool {
        let removed = [
            self.reference.invalidate(path),
            self.supply.invalidate(path),
            self.equipment.invalidate(path),
            self.labor.invalidate(path),
            self.rvu.invalidate(path),
        ];
        removed.iter().any(|r| *r)
    }

    pub fn clear(&self) {
        self.reference.clear();
        self.supply.clear();
        self.equipment.clear();
        self.labor.clear();
        self.rvu.clear();
        info!("Source cache cleared");
    }
}
