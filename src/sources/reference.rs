use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::columns::{parse_optional, Coercer, REFERENCE_COLUMNS};
use super::raw::read_rows;
use super::{Loaded, SourceProvenance};
use crate::error::{Result, ReviewError};
use crate::metrics::SourceMetrics;
use crate::types::{CodeDescriptors, CodeRecord, TimeComponents};

/// Load the reference table into canonical code records.
///
/// The first row is the header. Rows whose work value is not positive after
/// coercion are dropped.
#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_reference(path: &Path) -> Result<Loaded<CodeRecord>> {
    let started = Instant::now();
    let raw = read_rows(path)?;
    let mut rows = raw.rows.into_iter().zip(raw.lines);

    let (headers, _) = rows
        .next()
        .ok_or_else(|| ReviewError::schema(REFERENCE_COLUMNS.source_name, "file has no header row"))?;
    let index = REFERENCE_COLUMNS.resolve(&headers)?;

    let mut coercer = Coercer::new(REFERENCE_COLUMNS.source_name);
    let mut records = Vec::new();
    let mut rows_read = 0;
    let mut rows_dropped = 0;

    for (row, line) in rows {
        rows_read += 1;

        let mut num = |column: &str| coercer.column(&index, &row, line, column);
        let components = TimeComponents {
            pre_time_package: num("pre_time_pckg"),
            pre_eval_time: num("pre_eval_time"),
            pre_positioning_time: num("pre_posi_time"),
            pre_scrub_dress_wait_time: num("pre_sdw_time"),
            immediate_post_time: num("post_imed_time"),
            post_visit_time: num("post_visit_time"),
            hospital_postop_visits: num("hosp_postop_visit_count"),
            office_postop_visits: num("off_postop_visit_count"),
        };
        let current_work = num("current_work");
        let current_tt = num("current_tt");
        let current_ist = num("current_ist");

        if current_work <= 0.0 {
            debug!(line, hcpcs = index.text(&row, "hcpcs"), "Dropping row without positive work value");
            rows_dropped += 1;
            continue;
        }

        let text = |column: &str| index.optional_text(&row, column);
        let number = |column: &str| parse_optional(index.text(&row, column));

        records.push(CodeRecord {
            hcpcs: index.text(&row, "hcpcs").to_string(),
            description: index.text(&row, "long_desc").to_string(),
            global_value: index.text(&row, "global_value").to_string(),
            current_work,
            current_tt,
            current_ist,
            current_preservice: components.pre_time_package
                + components.pre_eval_time
                + components.pre_positioning_time,
            current_postservice: components.immediate_post_time + components.post_visit_time,
            components,
            descriptors: CodeDescriptors {
                non_facility_total_rvu: number("nf_rvu"),
                facility_total_rvu: number("f_rvu"),
                iwput: number("current_iwput"),
                time_source: text("time_source"),
                last_ruc_review: text("last_ruc_review"),
                top_specialty: text("top_specialty"),
                mpc: text("mpc"),
                vignette: text("vignette"),
                medicare_utilization: number("medicare21util"),
                medicare_allowed_charges: number("medicare21allowed"),
            },
        });
    }

    if coercer.fallbacks() > 0 {
        warn!(
            fallbacks = coercer.fallbacks(),
            "Some reference cells were not numeric and were read as zero"
        );
    }

    let provenance = SourceProvenance::new(
        REFERENCE_COLUMNS.source_name,
        path,
        raw.fingerprint,
        rows_read,
        rows_dropped,
        coercer.fallbacks(),
    );
    SourceMetrics::record_load(&provenance, started.elapsed().as_secs_f64());
    info!(
        records = records.len(),
        dropped = rows_dropped,
        "✅ Loaded reference table"
    );

    Ok(Loaded {
        rows: records,
        provenance,
    })
}
