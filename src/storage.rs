use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::constants::*;
use crate::sources::{EquipmentRow, LaborRow, Loaded, SourceProvenance, SourceTables, SupplyRow};
use crate::types::{CodeRecord, RvuRecord};

/// Read-only tabular capability the review engine runs against
pub trait Storage: Send + Sync {
    /// First reference record for `hcpcs`
    fn code_record(&self, hcpcs: &str) -> Option<&CodeRecord>;
    /// Every reference record, in file order
    fn reference_records(&self) -> &[CodeRecord];

    fn supply_rows(&self, hcpcs: &str) -> Vec<&SupplyRow>;
    fn equipment_rows(&self, hcpcs: &str) -> Vec<&EquipmentRow>;
    fn labor_rows(&self, hcpcs: &str) -> Vec<&LaborRow>;
    /// Relative-value rows for `hcpcs`, one per modifier
    fn rvu_rows(&self, hcpcs: &str) -> Vec<&RvuRecord>;

    fn provenance(&self) -> Vec<SourceProvenance>;
}

/// Row positions grouped by code
type CodeIndex = HashMap<String, Vec<usize>>;

fn index_by<T>(rows: &[T], key: impl Fn(&T) -> &str) -> CodeIndex {
    let mut index = CodeIndex::new();
    for (position, row) in rows.iter().enumerate() {
        index.entry(key(row).to_string()).or_default().push(position);
    }
    index
}

fn rows_for<'a, T>(rows: &'a [T], index: &CodeIndex, hcpcs: &str) -> Vec<&'a T> {
    index
        .get(hcpcs)
        .map(|positions| positions.iter().map(|&p| &rows[p]).collect())
        .unwrap_or_default()
}

/// Loaded tables held in memory and indexed by code
pub struct InMemoryStorage {
    reference: Arc<Loaded<CodeRecord>>,
    supply: Arc<Loaded<SupplyRow>>,
    equipment: Arc<Loaded<EquipmentRow>>,
    labor: Arc<Loaded<LaborRow>>,
    rvu: Arc<Loaded<RvuRecord>>,
    reference_index: CodeIndex,
    supply_index: CodeIndex,
    equipment_index: CodeIndex,
    labor_index: CodeIndex,
    rvu_index: CodeIndex,
}

impl InMemoryStorage {
    /// Build from rows assembled in memory (fixtures, tests)
    pub fn new(
        reference: Vec<CodeRecord>,
        supply: Vec<SupplyRow>,
        equipment: Vec<EquipmentRow>,
        labor: Vec<LaborRow>,
        rvu: Vec<RvuRecord>,
    ) -> Self {
        fn wrap<T>(name: &str, rows: Vec<T>) -> Arc<Loaded<T>> {
            let provenance = SourceProvenance::in_memory(name, rows.len());
            Arc::new(Loaded { rows, provenance })
        }

        Self::from_tables(SourceTables {
            reference: wrap(REFERENCE_TABLE, reference),
            supply: wrap(SUPPLY_TABLE, supply),
            equipment: wrap(EQUIPMENT_TABLE, equipment),
            labor: wrap(LABOR_TABLE, labor),
            rvu: wrap(RVU_TABLE, rvu),
        })
    }

    pub fn from_tables(tables: SourceTables) -> Self {
        let storage = Self {
            reference_index: index_by(&tables.reference.rows, |r| r.hcpcs.as_str()),
            supply_index: index_by(&tables.supply.rows, |r| r.hcpcs.as_str()),
            equipment_index: index_by(&tables.equipment.rows, |r| r.hcpcs.as_str()),
            labor_index: index_by(&tables.labor.rows, |r| r.hcpcs.as_str()),
            rvu_index: index_by(&tables.rvu.rows, |r| r.hcpcs.as_str()),
            reference: tables.reference,
            supply: tables.supply,
            equipment: tables.equipment,
            labor: tables.labor,
            rvu: tables.rvu,
        };
        debug!(
            codes = storage.reference_index.len(),
            supply_codes = storage.supply_index.len(),
            equipment_codes = storage.equipment_index.len(),
            labor_codes = storage.labor_index.len(),
            rvu_codes = storage.rvu_index.len(),
            "Indexed source tables"
        );
        storage
    }
}

impl Storage for InMemoryStorage {
    fn code_record(&self, hcpcs: &str) -> Option<&CodeRecord> {
        self.reference_index
            .get(hcpcs)
            .and_then(|positions| positions.first())
            .map(|&p| &self.reference.rows[p])
    }

    fn reference_records(&self) -> &[CodeRecord] {
        &self.reference.rows
    }

    fn supply_rows(&self, hcpcs: &str) -> Vec<&SupplyRow> {
        rows_for(&self.supply.rows, &self.supply_index, hcpcs)
    }

    fn equipment_rows(&self, hcpcs: &str) -> Vec<&EquipmentRow> {
        rows_for(&self.equipment.rows, &self.equipment_index, hcpcs)
    }

    fn labor_rows(&self, hcpcs: &str) -> Vec<&LaborRow> {
        rows_for(&self.labor.rows, &self.labor_index, hcpcs)
    }

    fn rvu_rows(&self, hcpcs: &str) -> Vec<&RvuRecord> {
        rows_for(&self.rvu.rows, &self.rvu_index, hcpcs)
    }

    fn provenance(&self) -> Vec<SourceProvenance> {
        vec![
            self.reference.provenance.clone(),
            self.supply.provenance.clone(),
            self.equipment.provenance.clone(),
            self.labor.provenance.clone(),
            self.rvu.provenance.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;

    fn supply(hcpcs: &str, price: f64) -> SupplyRow {
        SupplyRow {
            hcpcs: hcpcs.to_string(),
            item_code: None,
            description: None,
            nf_quantity: 1.0,
            f_quantity: 1.0,
            price,
        }
    }

    #[test]
    fn lookup_returns_first_occurrence() {
        let mut duplicate = record("10060", 40.0, 30.0, 9.0);
        duplicate.description = "later row".to_string();
        let storage = InMemoryStorage::new(
            vec![record("10060", 30.0, 20.0, 2.0), duplicate],
            vec![],
            vec![],
            vec![],
            vec![],
        );

        let found = storage.code_record("10060").unwrap();
        assert_eq!(found.current_work, 2.0);
        assert!(storage.code_record("99999").is_none());
        assert_eq!(storage.reference_records().len(), 2);
    }

    #[test]
    fn line_items_are_grouped_by_code() {
        let storage = InMemoryStorage::new(
            vec![],
            vec![supply("10060", 1.0), supply("11042", 2.0), supply("10060", 3.0)],
            vec![],
            vec![],
            vec![],
        );

        let prices: Vec<f64> = storage.supply_rows("10060").iter().map(|r| r.price).collect();
        assert_eq!(prices, vec![1.0, 3.0]);
        assert!(storage.labor_rows("10060").is_empty());
    }

    #[test]
    fn in_memory_provenance_covers_every_table() {
        let storage = InMemoryStorage::new(vec![record("A", 1.0, 1.0, 1.0)], vec![], vec![], vec![], vec![]);
        let provenance = storage.provenance();
        assert_eq!(provenance.len(), 5);
        assert_eq!(provenance[0].source_name, REFERENCE_TABLE);
        assert_eq!(provenance[0].rows_read, 1);
    }
}
