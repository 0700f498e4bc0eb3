use serde::Serialize;
use tracing::{debug, info, instrument};

use super::stats::{percentile, sorted_copy};
use crate::constants::QUARTILE_PERCENTILE;
use crate::error::{Result, ReviewError};
use crate::metrics::ReviewMetrics;
use crate::storage::Storage;
use crate::types::{CodeRecord, SearchWindow};

/// Comparison population and its lowest-work quartile.
///
/// An empty population has no percentile and an empty quartile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationSplit {
    pub global_value: String,
    pub population: Vec<CodeRecord>,
    pub quartile: Vec<CodeRecord>,
    pub work_percentile: Option<f64>,
}

impl PopulationSplit {
    pub fn is_empty(&self) -> bool {
        self.population.is_empty()
    }

    /// The split, or `EmptyPopulation` for callers that need data to work with
    pub fn require_population(self) -> Result<Self> {
        if self.is_empty() {
            return Err(ReviewError::EmptyPopulation {
                global_value: self.global_value,
            });
        }
        Ok(self)
    }

    pub fn quartile_work(&self) -> Vec<f64> {
        self.quartile.iter().map(|r| r.current_work).collect()
    }
}

/// Select reference codes in `global_value` whose total and intraservice
/// times fall inside `window`, then cut at the 25th percentile of work.
///
/// Order follows the reference table. Ties at the cutoff stay in the quartile.
#[instrument(skip(storage, window), fields(
    time_lower = window.time_lower,
    time_upper = window.time_upper,
    ist_lower = window.intraservice_lower,
    ist_upper = window.intraservice_upper,
))]
pub fn filter<S: Storage + ?Sized>(
    storage: &S,
    global_value: &str,
    window: &SearchWindow,
) -> PopulationSplit {
    let population: Vec<CodeRecord> = storage
        .reference_records()
        .iter()
        .filter(|r| r.global_value == global_value && window.contains(r))
        .filter(|r| {
            let keep = r.current_work.is_finite();
            if !keep {
                debug!(hcpcs = %r.hcpcs, "Dropping population member without a work value");
            }
            keep
        })
        .cloned()
        .collect();

    let work: Vec<f64> = population.iter().map(|r| r.current_work).collect();
    let work_percentile = percentile(&sorted_copy(&work), QUARTILE_PERCENTILE);

    let quartile: Vec<CodeRecord> = match work_percentile {
        Some(cutoff) => population
            .iter()
            .filter(|r| r.current_work <= cutoff)
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    ReviewMetrics::record_population(population.len(), quartile.len());
    info!(
        population = population.len(),
        quartile = quartile.len(),
        work_percentile = ?work_percentile,
        "🔎 Filtered comparison population"
    );

    PopulationSplit {
        global_value: global_value.to_string(),
        population,
        quartile,
        work_percentile,
    }
}
