use std::collections::HashMap;
use tracing::debug;

use super::header::to_snake_case;
use crate::error::{Result, ReviewError};

/// Human-readable source header → canonical column name, for one source table.
///
/// Headers are compared in snake_case form, so `"Work RVU"`, `"work rvu"` and
/// `"WORK-RVU"` all resolve the same way. A header that already is a canonical
/// name resolves to itself.
#[derive(Debug)]
pub struct ColumnMapping {
    pub source_name: &'static str,
    pub aliases: &'static [(&'static str, &'static str)],
    pub required: &'static [&'static str],
    /// Unmapped columns with these prefixes are kept as grouped numeric columns
    pub prefixes: &'static [&'static str],
}

pub const REFERENCE_COLUMNS: ColumnMapping = ColumnMapping {
    source_name: crate::constants::REFERENCE_TABLE,
    aliases: &[
        ("CPT Code", "hcpcs"),
        ("Long Desc", "long_desc"),
        ("Global", "global_value"),
        ("Work RVU", "current_work"),
        ("Non-Facility Total RVU", "nf_rvu"),
        ("Facility Total RVU", "f_rvu"),
        ("Pre Time Package", "pre_time_pckg"),
        ("Pre Eval Time", "pre_eval_time"),
        ("Pre Positioning Time", "pre_posi_time"),
        ("Pre Scrub, Dress, Wait Time", "pre_sdw_time"),
        ("Intra Time", "current_ist"),
        ("Immediate Post Time", "post_imed_time"),
        ("Post-op Visit Time", "post_visit_time"),
        ("Total Time", "current_tt"),
        ("Hospital Post-op Visit Count", "hosp_postop_visit_count"),
        ("Office Post-op Visit Count", "off_postop_visit_count"),
        ("Time Source", "time_source"),
        ("Most Recent RUC Review", "last_ruc_review"),
        ("Top_Specialty", "top_specialty"),
        ("IWPUT", "current_iwput"),
        ("MPC", "mpc"),
        ("Vignette", "vignette"),
        ("2021 Medicare Utilization", "medicare21util"),
        ("2021 Medicare Allowed Charges", "medicare21allowed"),
    ],
    required: &[
        "hcpcs",
        "global_value",
        "current_work",
        "current_tt",
        "current_ist",
        "pre_time_pckg",
        "pre_eval_time",
        "pre_posi_time",
        "post_imed_time",
        "post_visit_time",
    ],
    prefixes: &[],
};

pub const SUPPLY_COLUMNS: ColumnMapping = ColumnMapping {
    source_name: crate::constants::SUPPLY_TABLE,
    aliases: &[
        ("HCPCS", "hcpcs"),
        ("CPT Code", "hcpcs"),
        ("Supply Code", "item_code"),
        ("CMS Code", "item_code"),
        ("Description", "description"),
        ("NF Quantity", "nf_quantity"),
        ("Non-Facility Quantity", "nf_quantity"),
        ("F Quantity", "f_quantity"),
        ("Facility Quantity", "f_quantity"),
        ("Price", "price"),
        ("Unit Price", "price"),
    ],
    required: &["hcpcs", "nf_quantity", "f_quantity", "price"],
    prefixes: &[],
};

pub const EQUIPMENT_COLUMNS: ColumnMapping = ColumnMapping {
    source_name: crate::constants::EQUIPMENT_TABLE,
    aliases: &[
        ("HCPCS", "hcpcs"),
        ("CPT Code", "hcpcs"),
        ("Equipment Code", "item_code"),
        ("CMS Code", "item_code"),
        ("Description", "description"),
        ("Price", "price"),
        ("Useful Life", "useful_life"),
        ("Minutes Per Year", "minutes_per_year"),
        ("NF Time", "nf_time"),
        ("Non-Facility Time", "nf_time"),
        ("F Time", "f_time"),
        ("Facility Time", "f_time"),
    ],
    required: &[
        "hcpcs",
        "price",
        "useful_life",
        "minutes_per_year",
        "nf_time",
        "f_time",
    ],
    prefixes: &[],
};

pub const LABOR_COLUMNS: ColumnMapping = ColumnMapping {
    source_name: crate::constants::LABOR_TABLE,
    aliases: &[
        ("HCPCS", "hcpcs"),
        ("CPT Code", "hcpcs"),
        ("Labor Code", "item_code"),
        ("CMS Code", "item_code"),
        ("Description", "description"),
        ("Rate Per Minute", "rate_per_minute"),
    ],
    required: &["hcpcs", "rate_per_minute"],
    prefixes: &["nf_", "f_"],
};

/// Where each canonical column sits in the source rows
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    positions: HashMap<&'static str, usize>,
    grouped: HashMap<&'static str, Vec<usize>>,
}

impl ColumnMapping {
    fn canonical_for(&self, header: &str) -> Option<&'static str> {
        let normalized = to_snake_case(header);
        self.aliases
            .iter()
            .find(|(alias, canonical)| {
                to_snake_case(alias) == normalized || *canonical == normalized
            })
            .map(|(_, canonical)| *canonical)
    }

    /// Resolve a header row against this mapping.
    ///
    /// Fails with `Schema` when a required column is missing or two headers
    /// claim the same canonical column.
    pub fn resolve(&self, headers: &[String]) -> Result<ColumnIndex> {
        let mut positions: HashMap<&'static str, usize> = HashMap::new();
        let mut grouped: HashMap<&'static str, Vec<usize>> = HashMap::new();

        for (position, header) in headers.iter().enumerate() {
            if let Some(canonical) = self.canonical_for(header) {
                if let Some(previous) = positions.insert(canonical, position) {
                    return Err(ReviewError::schema(
                        self.source_name,
                        format!(
                            "columns {} and {} both map to '{}'",
                            previous + 1,
                            position + 1,
                            canonical
                        ),
                    ));
                }
                continue;
            }

            let normalized = to_snake_case(header);
            match self.prefixes.iter().find(|p| normalized.starts_with(*p)) {
                Some(prefix) => grouped.entry(*prefix).or_default().push(position),
                None => debug!(source = self.source_name, header = %header, "Ignoring unmapped column"),
            }
        }

        let missing: Vec<&str> = self
            .required
            .iter()
            .copied()
            .filter(|name| !positions.contains_key(name))
            .collect();
        if !missing.is_empty() {
            return Err(ReviewError::schema(
                self.source_name,
                format!("missing required columns: {}", missing.join(", ")),
            ));
        }

        if !self.prefixes.is_empty() && grouped.is_empty() {
            return Err(ReviewError::schema(
                self.source_name,
                format!("no columns with prefixes {}", self.prefixes.join(" / ")),
            ));
        }

        Ok(ColumnIndex { positions, grouped })
    }
}

impl ColumnIndex {
    /// Cell text for a canonical column, empty when the column is absent
    pub fn text<'r>(&self, row: &'r [String], column: &str) -> &'r str {
        self.positions
            .get(column)
            .and_then(|&position| row.get(position))
            .map(|cell| cell.trim())
            .unwrap_or("")
    }

    pub fn optional_text(&self, row: &[String], column: &str) -> Option<String> {
        let text = self.text(row, column);
        (!text.is_empty()).then(|| text.to_string())
    }

    pub fn group(&self, prefix: &str) -> &[usize] {
        self.grouped.get(prefix).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Numeric coercion that never fails: unparseable cells become zero and are counted.
#[derive(Debug)]
pub struct Coercer {
    source_name: &'static str,
    fallbacks: usize,
}

impl Coercer {
    pub fn new(source_name: &'static str) -> Self {
        Self {
            source_name,
            fallbacks: 0,
        }
    }

    /// Parse a cell as a finite number; blank is zero, anything else unparseable is a fallback to zero
    pub fn number(&mut self, line: usize, column: &str, cell: &str) -> f64 {
        let cell = cell.trim();
        if cell.is_empty() {
            return 0.0;
        }
        match cell.parse::<f64>() {
            Ok(value) if value.is_finite() => value,
            _ => {
                self.fallbacks += 1;
                debug!(
                    source = self.source_name,
                    line,
                    column,
                    cell,
                    "Numeric coercion fell back to zero"
                );
                0.0
            }
        }
    }

    pub fn column(&mut self, index: &ColumnIndex, row: &[String], line: usize, column: &str) -> f64 {
        self.number(line, column, index.text(row, column))
    }

    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }
}

/// Lenient parse for descriptive numeric columns that are not coerced
pub fn parse_optional(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn human_and_canonical_headers_both_resolve() {
        let index = SUPPLY_COLUMNS
            .resolve(&headers(&["CPT Code", "supply_code", "NF Quantity", "f_quantity", "PRICE"]))
            .unwrap();
        let row = headers(&["10060", "SA001", "2", "1", "3.5"]);
        assert_eq!(index.text(&row, "hcpcs"), "10060");
        assert_eq!(index.text(&row, "item_code"), "SA001");
        assert_eq!(index.text(&row, "price"), "3.5");
    }

    #[test]
    fn missing_required_column_is_schema_error() {
        let err = SUPPLY_COLUMNS
            .resolve(&headers(&["HCPCS", "NF Quantity", "Price"]))
            .unwrap_err();
        match err {
            ReviewError::Schema { source_name, detail } => {
                assert_eq!(source_name, "supply");
                assert!(detail.contains("f_quantity"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicate_mapping_is_schema_error() {
        let err = SUPPLY_COLUMNS
            .resolve(&headers(&["HCPCS", "CPT Code", "NF Quantity", "F Quantity", "Price"]))
            .unwrap_err();
        assert!(matches!(err, ReviewError::Schema { .. }));
    }

    #[test]
    fn labor_minute_columns_group_by_prefix() {
        let index = LABOR_COLUMNS
            .resolve(&headers(&[
                "HCPCS",
                "Rate Per Minute",
                "NF Pre-Service Time",
                "NF Intra Time",
                "F Post Time",
                "Notes",
            ]))
            .unwrap();
        assert_eq!(index.group("nf_"), &[2, 3]);
        assert_eq!(index.group("f_"), &[4]);
    }

    #[test]
    fn labor_without_minute_columns_is_schema_error() {
        let err = LABOR_COLUMNS
            .resolve(&headers(&["HCPCS", "Rate Per Minute"]))
            .unwrap_err();
        assert!(matches!(err, ReviewError::Schema { .. }));
    }

    #[test]
    fn coercion_falls_back_to_zero_and_counts() {
        let mut coercer = Coercer::new("reference");
        assert_eq!(coercer.number(2, "current_tt", "42.5"), 42.5);
        assert_eq!(coercer.number(2, "current_tt", ""), 0.0);
        assert_eq!(coercer.number(3, "current_tt", "n/a"), 0.0);
        assert_eq!(coercer.number(4, "current_tt", "NaN"), 0.0);
        assert_eq!(coercer.fallbacks(), 2);
    }
}
