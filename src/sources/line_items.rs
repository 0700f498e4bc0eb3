use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::columns::{
    ColumnIndex, ColumnMapping, Coercer, EQUIPMENT_COLUMNS, LABOR_COLUMNS, SUPPLY_COLUMNS,
};
use super::header::{detect_header, non_blank_lines, pad_rows, remove_blank_rows_and_columns};
use super::raw::read_rows;
use super::{Loaded, SourceProvenance};
use crate::error::{Result, ReviewError};
use crate::metrics::SourceMetrics;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplyRow {
    pub hcpcs: String,
    pub item_code: Option<String>,
    pub description: Option<String>,
    pub nf_quantity: f64,
    pub f_quantity: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquipmentRow {
    pub hcpcs: String,
    pub item_code: Option<String>,
    pub description: Option<String>,
    pub price: f64,
    pub useful_life: f64,
    pub minutes_per_year: f64,
    pub nf_time: f64,
    pub f_time: f64,
}

/// Clinical labor line; minutes are summed across every `nf_`/`f_` time column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaborRow {
    pub hcpcs: String,
    pub item_code: Option<String>,
    pub description: Option<String>,
    pub rate_per_minute: f64,
    pub nf_minutes: f64,
    pub f_minutes: f64,
}

#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_supply(path: &Path) -> Result<Loaded<SupplyRow>> {
    load_line_items(path, &SUPPLY_COLUMNS, |index, row, line, coercer| SupplyRow {
        hcpcs: index.text(row, "hcpcs").to_string(),
        item_code: index.optional_text(row, "item_code"),
        description: index.optional_text(row, "description"),
        nf_quantity: coercer.column(index, row, line, "nf_quantity"),
        f_quantity: coercer.column(index, row, line, "f_quantity"),
        price: coercer.column(index, row, line, "price"),
    })
}

#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_equipment(path: &Path) -> Result<Loaded<EquipmentRow>> {
    load_line_items(path, &EQUIPMENT_COLUMNS, |index, row, line, coercer| EquipmentRow {
        hcpcs: index.text(row, "hcpcs").to_string(),
        item_code: index.optional_text(row, "item_code"),
        description: index.optional_text(row, "description"),
        price: coercer.column(index, row, line, "price"),
        useful_life: coercer.column(index, row, line, "useful_life"),
        minutes_per_year: coercer.column(index, row, line, "minutes_per_year"),
        nf_time: coercer.column(index, row, line, "nf_time"),
        f_time: coercer.column(index, row, line, "f_time"),
    })
}

#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_labor(path: &Path) -> Result<Loaded<LaborRow>> {
    load_line_items(path, &LABOR_COLUMNS, |index, row, line, coercer| {
        let mut minutes = |prefix: &str| -> f64 {
            index
                .group(prefix)
                .iter()
                .map(|&position| {
                    let cell = row.get(position).map(String::as_str).unwrap_or("");
                    coercer.number(line, prefix, cell)
                })
                .sum()
        };
        let nf_minutes = minutes("nf_");
        let f_minutes = minutes("f_");

        LaborRow {
            hcpcs: index.text(row, "hcpcs").to_string(),
            item_code: index.optional_text(row, "item_code"),
            description: index.optional_text(row, "description"),
            rate_per_minute: coercer.column(index, row, line, "rate_per_minute"),
            nf_minutes,
            f_minutes,
        }
    })
}

/// Shared spreadsheet path: clean blanks, find the header, map columns, parse rows.
///
/// Rows without a code identifier are dropped.
fn load_line_items<T>(
    path: &Path,
    mapping: &ColumnMapping,
    parse: impl Fn(&ColumnIndex, &[String], usize, &mut Coercer) -> T,
) -> Result<Loaded<T>> {
    let started = Instant::now();
    let raw = read_rows(path)?;

    let lines = non_blank_lines(&raw.rows, &raw.lines);
    let mut rows = remove_blank_rows_and_columns(raw.rows);
    pad_rows(&mut rows);
    let (header_row, header) = detect_header(&rows).ok_or_else(|| {
        ReviewError::schema(mapping.source_name, "could not locate a complete header row")
    })?;
    let index = mapping.resolve(&header)?;

    let mut coercer = Coercer::new(mapping.source_name);
    let mut items = Vec::new();
    let mut rows_read = 0;
    let mut rows_dropped = 0;

    for (row, &line) in rows.iter().zip(&lines).skip(header_row + 1) {
        rows_read += 1;
        if index.text(row, "hcpcs").is_empty() {
            debug!(source = mapping.source_name, line, "Dropping line item without a code");
            rows_dropped += 1;
            continue;
        }
        items.push(parse(&index, row.as_slice(), line, &mut coercer));
    }

    if coercer.fallbacks() > 0 {
        warn!(
            source = mapping.source_name,
            fallbacks = coercer.fallbacks(),
            "Some line item cells were not numeric and were read as zero"
        );
    }

    let provenance = SourceProvenance::new(
        mapping.source_name,
        path,
        raw.fingerprint,
        rows_read,
        rows_dropped,
        coercer.fallbacks(),
    );
    SourceMetrics::record_load(&provenance, started.elapsed().as_secs_f64());
    info!(
        source = mapping.source_name,
        items = items.len(),
        "✅ Loaded line item table"
    );

    Ok(Loaded {
        rows: items,
        provenance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "{}", body).unwrap();
        file
    }

    #[test]
    fn supply_rows_parse_with_human_headers() {
        let file = write_csv(
            "HCPCS,Supply Code,Description,NF Quantity,F Quantity,Price\n\
             10060,SA048,pack minimum,1,0,1.5\n\
             ,,,,,\n\
             10060,SB007,drape,2,1,x\n",
        );

        let loaded = load_supply(file.path()).unwrap();
        assert_eq!(loaded.rows.len(), 2);
        assert_eq!(loaded.rows[0].item_code.as_deref(), Some("SA048"));
        assert_eq!(loaded.rows[0].nf_quantity, 1.0);
        assert_eq!(loaded.rows[1].price, 0.0);
        assert_eq!(loaded.provenance.coercion_fallbacks, 1);
    }

    #[test]
    fn labor_minutes_sum_across_prefixed_columns() {
        let file = write_csv(
            "HCPCS,Labor Code,Rate Per Minute,NF Pre Time,NF Intra Time,F Pre Time,F Intra Time\n\
             10060,L037D,0.5,3,10,2,4\n",
        );

        let loaded = load_labor(file.path()).unwrap();
        let row = &loaded.rows[0];
        assert_eq!(row.nf_minutes, 13.0);
        assert_eq!(row.f_minutes, 6.0);
        assert_eq!(row.rate_per_minute, 0.5);
    }

    #[test]
    fn split_header_is_detected_before_mapping() {
        let file = write_csv(
            "HCPCS,,,,,,\n\
             ,Price,Useful Life,Minutes Per Year,NF Time,F Time,Equipment Code\n\
             10060,1000,5,100000,20,10,EF031\n",
        );

        let loaded = load_equipment(file.path()).unwrap();
        assert_eq!(loaded.rows.len(), 1);
        assert_eq!(loaded.rows[0].useful_life, 5.0);
        assert_eq!(loaded.rows[0].item_code.as_deref(), Some("EF031"));
    }

    fn fixture(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
    }

    #[test]
    fn supply_workbook_with_split_header_and_numeric_codes() {
        let loaded = load_supply(&fixture("supply.xlsx")).unwrap();

        let codes: Vec<&str> = loaded.rows.iter().map(|r| r.hcpcs.as_str()).collect();
        assert_eq!(codes, vec!["10060", "11000", "0001U"]);
        assert_eq!(loaded.rows[0].item_code.as_deref(), Some("SA048"));
        assert_eq!(loaded.rows[0].nf_quantity, 2.0);
        assert_eq!(loaded.rows[0].price, 1.5);
        assert_eq!(loaded.rows[2].nf_quantity, 0.0);
        assert_eq!(loaded.provenance.rows_read, 3);
        assert_eq!(loaded.provenance.coercion_fallbacks, 1);
        assert_eq!(loaded.provenance.fingerprint.len(), 64);
    }

    #[test]
    fn labor_workbook_sums_minutes() {
        let loaded = load_labor(&fixture("labor.xlsx")).unwrap();
        let row = &loaded.rows[0];
        assert_eq!(row.hcpcs, "10060");
        assert_eq!(row.nf_minutes, 13.0);
        assert_eq!(row.f_minutes, 6.0);
        assert_eq!(row.rate_per_minute, 0.5);
    }

    #[test]
    fn equipment_without_useful_life_is_schema_error() {
        let file = write_csv("HCPCS,Price,Minutes Per Year,NF Time,F Time\n10060,1,1,1,1\n");
        let err = load_equipment(file.path()).unwrap_err();
        assert!(matches!(err, ReviewError::Schema { .. }));
    }
}
