use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::columns::Coercer;
use super::raw::read_rows;
use super::{Loaded, SourceProvenance};
use crate::constants::RVU_TABLE;
use crate::error::{Result, ReviewError};
use crate::metrics::SourceMetrics;
use crate::types::RvuRecord;

/// Positional layout of the relative-value file. Names are assigned by
/// position, never read from the file's own header row.
pub const RVU_COLUMNS: [&str; 31] = [
    "hcpcs",
    "mod",
    "description",
    "status_code",
    "not_used_for_medicare_payment",
    "work_rvu",
    "nf_pe_rvu",
    "nf_indicator",
    "f_pe_rvu",
    "f_indicator",
    "mp_rvu",
    "nf_total",
    "f_total",
    "pctc_ind",
    "glob_days",
    "pre_op",
    "intra_op",
    "post_op",
    "mult_proc",
    "bilat_surg",
    "asst_surg",
    "co_surg",
    "team_surg",
    "endo_base",
    "conv_factor",
    "phys_sup_diag",
    "calc_flag",
    "diag_img_ind",
    "pe_opps_nf",
    "pe_opps_f",
    "mp_opps",
];

// Positions of the columns parsed into typed fields; the rest land in `indicators`
const HCPCS: usize = 0;
const MODIFIER: usize = 1;
const DESCRIPTION: usize = 2;
const STATUS_CODE: usize = 3;
const WORK_RVU: usize = 5;
const NF_PE_RVU: usize = 6;
const F_PE_RVU: usize = 8;
const MP_RVU: usize = 10;
const NF_TOTAL: usize = 11;
const F_TOTAL: usize = 12;
const GLOB_DAYS: usize = 14;
const PRE_OP: usize = 15;
const INTRA_OP: usize = 16;
const POST_OP: usize = 17;
const ENDO_BASE: usize = 23;
const CONV_FACTOR: usize = 24;

const TYPED_POSITIONS: [usize; 16] = [
    HCPCS, MODIFIER, DESCRIPTION, STATUS_CODE, WORK_RVU, NF_PE_RVU, F_PE_RVU, MP_RVU, NF_TOTAL,
    F_TOTAL, GLOB_DAYS, PRE_OP, INTRA_OP, POST_OP, ENDO_BASE, CONV_FACTOR,
];

/// Load the relative-value file.
///
/// The first `header_skip` file lines are preamble, blank lines included. The
/// next record is the file's header and is only checked for width, and every
/// following record must have exactly 31 columns.
#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_rvu(path: &Path, header_skip: usize) -> Result<Loaded<RvuRecord>> {
    let started = Instant::now();
    let raw = read_rows(path)?;
    let mut rows = raw
        .rows
        .into_iter()
        .zip(raw.lines)
        .skip_while(|(_, line)| *line <= header_skip);

    let (header, _) = rows.next().ok_or_else(|| {
        ReviewError::schema(
            RVU_TABLE,
            format!("file ends before the header row after {} skipped lines", header_skip),
        )
    })?;
    if header.len() != RVU_COLUMNS.len() {
        return Err(ReviewError::schema(
            RVU_TABLE,
            format!(
                "expected {} columns, header row has {}",
                RVU_COLUMNS.len(),
                header.len()
            ),
        ));
    }

    let mut coercer = Coercer::new(RVU_TABLE);
    let mut records = Vec::new();
    let mut rows_read = 0;
    let mut rows_dropped = 0;

    for (row, line) in rows {
        rows_read += 1;
        if row.len() != RVU_COLUMNS.len() {
            return Err(ReviewError::schema(
                RVU_TABLE,
                format!(
                    "record {} has {} columns, expected {}",
                    line,
                    row.len(),
                    RVU_COLUMNS.len()
                ),
            ));
        }

        let cell = |position: usize| row[position].as_str();
        if cell(HCPCS).is_empty() {
            debug!(line, "Dropping RVU row without a code");
            rows_dropped += 1;
            continue;
        }

        let mut num =
            |position: usize| coercer.number(line, RVU_COLUMNS[position], row[position].as_str());
        let work_rvu = num(WORK_RVU);
        let nf_pe_rvu = num(NF_PE_RVU);
        let f_pe_rvu = num(F_PE_RVU);
        let mp_rvu = num(MP_RVU);
        let nf_total = num(NF_TOTAL);
        let f_total = num(F_TOTAL);
        let pre_op = num(PRE_OP);
        let intra_op = num(INTRA_OP);
        let post_op = num(POST_OP);
        let conv_factor = num(CONV_FACTOR);

        let indicators: BTreeMap<String, String> = RVU_COLUMNS
            .iter()
            .zip(row.iter())
            .enumerate()
            .filter(|(position, _)| !TYPED_POSITIONS.contains(position))
            .map(|(_, (name, value))| (name.to_string(), value.clone()))
            .collect();

        records.push(RvuRecord {
            hcpcs: cell(HCPCS).to_string(),
            modifier: cell(MODIFIER).to_string(),
            description: cell(DESCRIPTION).to_string(),
            status_code: cell(STATUS_CODE).to_string(),
            work_rvu,
            nf_pe_rvu,
            f_pe_rvu,
            mp_rvu,
            nf_total,
            f_total,
            glob_days: cell(GLOB_DAYS).to_string(),
            pre_op,
            intra_op,
            post_op,
            endo_base: cell(ENDO_BASE).to_string(),
            conv_factor,
            indicators,
        });
    }

    if coercer.fallbacks() > 0 {
        warn!(
            fallbacks = coercer.fallbacks(),
            "Some RVU cells were not numeric and were read as zero"
        );
    }

    let provenance = SourceProvenance::new(
        RVU_TABLE,
        path,
        raw.fingerprint,
        rows_read,
        rows_dropped,
        coercer.fallbacks(),
    );
    SourceMetrics::record_load(&provenance, started.elapsed().as_secs_f64());
    info!(records = records.len(), "✅ Loaded relative value table");

    Ok(Loaded {
        rows: records,
        provenance,
    })
}
