use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::constants::*;
use crate::error::{Result, ReviewError};
use crate::metrics::ReviewMetrics;
use crate::sources::{EquipmentRow, LaborRow, SupplyRow};
use crate::storage::Storage;
use crate::types::{DirectExpenseTotals, ExpenseKind, ExpenseLineItem};

/// Direct practice expense for one code: every line item plus per-table and overall totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectExpense {
    pub hcpcs: String,
    pub line_items: Vec<ExpenseLineItem>,
    pub supply: DirectExpenseTotals,
    pub equipment: DirectExpenseTotals,
    pub labor: DirectExpenseTotals,
    pub totals: DirectExpenseTotals,
}

impl DirectExpense {
    /// Line-item tables with no rows for the code
    pub fn missing_tables(&self) -> Vec<&'static str> {
        [
            (SUPPLY_TABLE, ExpenseKind::Supply),
            (EQUIPMENT_TABLE, ExpenseKind::Equipment),
            (LABOR_TABLE, ExpenseKind::Labor),
        ]
        .into_iter()
        .filter(|(_, kind)| !self.line_items.iter().any(|item| item.kind == *kind))
        .map(|(table, _)| table)
        .collect()
    }
}

pub fn supply_contribution(row: &SupplyRow) -> DirectExpenseTotals {
    DirectExpenseTotals {
        facility_total: row.f_quantity * row.price,
        non_facility_total: row.nf_quantity * row.price,
    }
}

/// Price spread over useful life and annual minutes, times minutes used.
/// A zero life or zero minutes-per-year contributes nothing.
pub fn equipment_contribution(row: &EquipmentRow) -> DirectExpenseTotals {
    let time_factor = (row.price / row.useful_life) / row.minutes_per_year;
    let finite_or_zero = |value: f64| if value.is_finite() { value } else { 0.0 };
    DirectExpenseTotals {
        facility_total: finite_or_zero(time_factor * row.f_time),
        non_facility_total: finite_or_zero(time_factor * row.nf_time),
    }
}

pub fn labor_contribution(row: &LaborRow) -> DirectExpenseTotals {
    DirectExpenseTotals {
        facility_total: row.f_minutes * row.rate_per_minute,
        non_facility_total: row.nf_minutes * row.rate_per_minute,
    }
}

fn line_item(
    hcpcs: &str,
    kind: ExpenseKind,
    item_code: &Option<String>,
    description: &Option<String>,
    contribution: DirectExpenseTotals,
) -> ExpenseLineItem {
    ExpenseLineItem {
        hcpcs: hcpcs.to_string(),
        kind,
        item_code: item_code.clone(),
        description: description.clone(),
        facility_contrib: contribution.facility_total,
        non_facility_contrib: contribution.non_facility_total,
    }
}

/// Joins supply, equipment and labor line items for a code
pub struct DirectExpenseCalculator<'a, S: Storage + ?Sized> {
    storage: &'a S,
}

impl<'a, S: Storage + ?Sized> DirectExpenseCalculator<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    /// Compute facility and non-facility totals for `hcpcs`.
    ///
    /// Tables without rows for the code contribute zero. A code missing from
    /// all three tables is `NotFound`.
    #[instrument(skip(self))]
    pub fn compute(&self, hcpcs: &str) -> Result<DirectExpense> {
        let mut line_items = Vec::new();

        let supply: DirectExpenseTotals = self
            .storage
            .supply_rows(hcpcs)
            .into_iter()
            .map(|row| {
                let contribution = supply_contribution(row);
                line_items.push(line_item(
                    hcpcs,
                    ExpenseKind::Supply,
                    &row.item_code,
                    &row.description,
                    contribution,
                ));
                contribution
            })
            .sum();

        let equipment: DirectExpenseTotals = self
            .storage
            .equipment_rows(hcpcs)
            .into_iter()
            .map(|row| {
                let contribution = equipment_contribution(row);
                if row.useful_life == 0.0 || row.minutes_per_year == 0.0 {
                    debug!(item = ?row.item_code, "Equipment without life or annual minutes contributes zero");
                }
                line_items.push(line_item(
                    hcpcs,
                    ExpenseKind::Equipment,
                    &row.item_code,
                    &row.description,
                    contribution,
                ));
                contribution
            })
            .sum();

        let labor: DirectExpenseTotals = self
            .storage
            .labor_rows(hcpcs)
            .into_iter()
            .map(|row| {
                let contribution = labor_contribution(row);
                line_items.push(line_item(
                    hcpcs,
                    ExpenseKind::Labor,
                    &row.item_code,
                    &row.description,
                    contribution,
                ));
                contribution
            })
            .sum();

        if line_items.is_empty() {
            return Err(ReviewError::not_found("direct expense", hcpcs));
        }

        let expense = DirectExpense {
            hcpcs: hcpcs.to_string(),
            supply,
            equipment,
            labor,
            totals: supply + equipment + labor,
            line_items,
        };

        let missing = expense.missing_tables();
        if !missing.is_empty() {
            warn!(hcpcs, ?missing, "Line item tables have no rows for code; counted as zero");
        }
        ReviewMetrics::record_direct_expense(expense.line_items.len());
        info!(
            hcpcs,
            facility_total = expense.totals.facility_total,
            non_facility_total = expense.totals.non_facility_total,
            "💵 Computed direct practice expense"
        );
        Ok(expense)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;

    fn supply(hcpcs: &str, nf_quantity: f64, f_quantity: f64, price: f64) -> SupplyRow {
        SupplyRow {
            hcpcs: hcpcs.to_string(),
            item_code: Some("SA048".to_string()),
            description: None,
            nf_quantity,
            f_quantity,
            price,
        }
    }

    fn equipment(hcpcs: &str, price: f64, useful_life: f64, minutes_per_year: f64) -> EquipmentRow {
        EquipmentRow {
            hcpcs: hcpcs.to_string(),
            item_code: Some("EF031".to_string()),
            description: None,
            price,
            useful_life,
            minutes_per_year,
            nf_time: 20.0,
            f_time: 10.0,
        }
    }

    fn labor(hcpcs: &str, rate: f64, nf_minutes: f64, f_minutes: f64) -> LaborRow {
        LaborRow {
            hcpcs: hcpcs.to_string(),
            item_code: Some("L037D".to_string()),
            description: None,
            rate_per_minute: rate,
            nf_minutes,
            f_minutes,
        }
    }

    #[test]
    fn totals_sum_across_all_three_tables() {
        let storage = InMemoryStorage::new(
            vec![],
            vec![supply("10060", 2.0, 1.0, 1.5), supply("11042", 9.0, 9.0, 9.0)],
            vec![equipment("10060", 1000.0, 5.0, 100.0)],
            vec![labor("10060", 0.5, 13.0, 6.0)],
            vec![],
        );

        let expense = DirectExpenseCalculator::new(&storage).compute("10060").unwrap();
        // supply 1.5 / 3.0, equipment 2*10=20 / 2*20=40, labor 3 / 6.5
        assert_eq!(expense.supply.facility_total, 1.5);
        assert_eq!(expense.equipment.non_facility_total, 40.0);
        assert_eq!(expense.labor.non_facility_total, 6.5);
        assert_eq!(expense.totals.facility_total, 24.5);
        assert_eq!(expense.totals.non_facility_total, 49.5);
        assert_eq!(expense.line_items.len(), 3);
        assert!(expense.missing_tables().is_empty());
    }

    #[test]
    fn zero_useful_life_contributes_zero() {
        let contribution = equipment_contribution(&equipment("10060", 1000.0, 0.0, 100.0));
        assert_eq!(contribution, DirectExpenseTotals::default());
        let contribution = equipment_contribution(&equipment("10060", 0.0, 0.0, 0.0));
        assert_eq!(contribution, DirectExpenseTotals::default());
    }

    #[test]
    fn missing_tables_are_zero_filled() {
        let storage = InMemoryStorage::new(
            vec![],
            vec![supply("10060", 2.0, 1.0, 1.5)],
            vec![],
            vec![],
            vec![],
        );

        let expense = DirectExpenseCalculator::new(&storage).compute("10060").unwrap();
        assert_eq!(expense.totals.non_facility_total, 3.0);
        assert_eq!(expense.missing_tables(), vec![EQUIPMENT_TABLE, LABOR_TABLE]);
    }

    #[test]
    fn code_absent_from_every_table_is_not_found() {
        let storage = InMemoryStorage::new(vec![], vec![supply("10060", 1.0, 1.0, 1.0)], vec![], vec![], vec![]);
        let err = DirectExpenseCalculator::new(&storage).compute("99999").unwrap_err();
        assert!(matches!(err, ReviewError::NotFound { .. }));
    }
}
