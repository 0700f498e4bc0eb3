use tracing::{debug, instrument};

use crate::config::SearchConfig;
use crate::constants::REFERENCE_TABLE;
use crate::error::{Result, ReviewError};
use crate::metrics::ReviewMetrics;
use crate::storage::Storage;
use crate::types::{AllowableBounds, CodeRecord, SearchWindow};

/// Canonical attributes for `hcpcs`; the first reference row wins when a code repeats
#[instrument(skip(storage))]
pub fn lookup<S: Storage + ?Sized>(storage: &S, hcpcs: &str) -> Result<CodeRecord> {
    let found = storage.code_record(hcpcs).cloned();
    ReviewMetrics::record_lookup(found.is_some());
    match found {
        Some(record) => {
            debug!(global_value = %record.global_value, work = record.current_work, "Found code");
            Ok(record)
        }
        None => Err(ReviewError::not_found(REFERENCE_TABLE, hcpcs)),
    }
}

/// Slider limits: zero up to a multiple of the current times.
///
/// The time limit never falls below the default window's upper bound, so
/// short codes can still be re-windowed.
pub fn allowable_bounds(record: &CodeRecord, search: &SearchConfig) -> AllowableBounds {
    AllowableBounds {
        time_min: 0.0,
        time_max: (search.allowable_multiplier * record.current_tt)
            .max(record.current_tt + search.time_offset),
        intraservice_min: 0.0,
        intraservice_max: (search.allowable_multiplier * record.current_ist).max(record.current_ist),
    }
}

/// Total time +/- the configured offset (floored), intraservice pinned to the current value
pub fn derive_default_window(record: &CodeRecord, search: &SearchConfig) -> SearchWindow {
    SearchWindow {
        time_lower: (record.current_tt - search.time_offset).max(search.min_time_lower),
        time_upper: record.current_tt + search.time_offset,
        intraservice_lower: record.current_ist,
        intraservice_upper: record.current_ist,
        allowable: allowable_bounds(record, search),
    }
}

/// Reject windows that are inverted, non-finite or outside `bounds`.
///
/// `bounds` come from the code under review, never from the window itself.
pub fn validate_window(window: &SearchWindow, bounds: &AllowableBounds) -> Result<()> {
    let checks = [
        ("time", window.time_lower, window.time_upper, bounds.time_min, bounds.time_max),
        (
            "intraservice",
            window.intraservice_lower,
            window.intraservice_upper,
            bounds.intraservice_min,
            bounds.intraservice_max,
        ),
    ];

    for (axis, lower, upper, min, max) in checks {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(ReviewError::InvalidWindow(format!("{} bounds must be finite", axis)));
        }
        if lower > upper {
            return Err(ReviewError::InvalidWindow(format!(
                "{} lower bound {} exceeds upper bound {}",
                axis, lower, upper
            )));
        }
        if lower < min || upper > max {
            return Err(ReviewError::InvalidWindow(format!(
                "{} range {}..={} is outside allowable {}..={}",
                axis, lower, upper, min, max
            )));
        }
    }
    Ok(())
}
