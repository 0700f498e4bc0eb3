//! Source Loader: reads the reference, line item and relative-value tables
//! and normalizes them into canonical records.

pub mod cache;
pub mod columns;
pub mod header;
pub mod line_items;
pub mod raw;
pub mod reference;
pub mod rvu;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::SourcesConfig;
use crate::error::Result;
use crate::types::{CodeRecord, RvuRecord};

pub use cache::{SourceCache, SOURCE_CACHE};
pub use line_items::{load_equipment, load_labor, load_supply, EquipmentRow, LaborRow, SupplyRow};
pub use reference::load_reference;
pub use rvu::load_rvu;

/// Where a table came from and what the loader did to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceProvenance {
    pub source_name: String,
    pub path: PathBuf,
    /// SHA-256 of the file bytes, hex encoded
    pub fingerprint: String,
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub coercion_fallbacks: usize,
    pub loaded_at: DateTime<Utc>,
}

impl SourceProvenance {
    pub fn new(
        source_name: &str,
        path: &Path,
        fingerprint: String,
        rows_read: usize,
        rows_dropped: usize,
        coercion_fallbacks: usize,
    ) -> Self {
        Self {
            source_name: source_name.to_string(),
            path: path.to_path_buf(),
            fingerprint,
            rows_read,
            rows_dropped,
            coercion_fallbacks,
            loaded_at: Utc::now(),
        }
    }

    /// Provenance for tables assembled in memory rather than read from disk
    pub fn in_memory(source_name: &str, rows: usize) -> Self {
        Self::new(source_name, Path::new(""), String::new(), rows, 0, 0)
    }
}

/// A loaded table: typed rows plus provenance
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub rows: Vec<T>,
    pub provenance: SourceProvenance,
}

/// All five tables a review needs, shared out of the cache
#[derive(Clone)]
pub struct SourceTables {
    pub reference: Arc<Loaded<CodeRecord>>,
    pub supply: Arc<Loaded<SupplyRow>>,
    pub equipment: Arc<Loaded<EquipmentRow>>,
    pub labor: Arc<Loaded<LaborRow>>,
    pub rvu: Arc<Loaded<RvuRecord>>,
}

impl SourceTables {
    /// Load (or fetch from `cache`) every table named in the configuration.
    ///
    /// Any missing file or schema mismatch aborts the whole load.
    pub fn load(config: &SourcesConfig, cache: &SourceCache) -> Result<Self> {
        info!(data_dir = %config.data_dir.display(), "📥 Loading source tables");
        let header_skip = config.rvu_header_skip;

        let tables = Self {
            reference: cache
                .reference
                .get_or_load(&config.reference_path(), load_reference)?,
            supply: cache.supply.get_or_load(&config.supply_path(), load_supply)?,
            equipment: cache
                .equipment
                .get_or_load(&config.equipment_path(), load_equipment)?,
            labor: cache.labor.get_or_load(&config.labor_path(), load_labor)?,
            rvu: cache
                .rvu
                .get_or_load(&config.rvu_path(), |path| load_rvu(path, header_skip))?,
        };
        Ok(tables)
    }

    pub fn provenance(&self) -> Vec<SourceProvenance> {
        vec![
            self.reference.provenance.clone(),
            self.supply.provenance.clone(),
            self.equipment.provenance.clone(),
            self.labor.provenance.clone(),
            self.rvu.provenance.clone(),
        ]
    }
}
