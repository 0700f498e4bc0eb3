use serde::Serialize;
use tracing::{debug, instrument};

use super::population::PopulationSplit;
use super::stats::{guarded_ratio, median};
use crate::types::{CodeRecord, ProposedValues};

/// Ratios and quartile statistics supporting a proposed valuation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefinementResult {
    pub time_ratio: f64,
    pub time_ratio_percent: f64,
    pub time_ratio_work: f64,
    pub intensity_ratio: f64,
    pub intensity_ratio_work: f64,
    pub population_count: usize,
    pub quartile_count: usize,
    /// `None` when the quartile is empty
    pub quartile_median_work: Option<f64>,
    pub below_target_count: usize,
    pub crosswalk_candidates: Vec<CodeRecord>,
}

/// Proposed total time over current total time; 0.0 when current is zero
pub fn time_ratio(proposed_tt: f64, current_tt: f64) -> f64 {
    guarded_ratio(proposed_tt, current_tt)
}

/// Proposed intraservice time over current; 0.0 when current is zero
pub fn intensity_ratio(proposed_ist: f64, current_ist: f64) -> f64 {
    guarded_ratio(proposed_ist, current_ist)
}

/// Whether a quartile work value matches the target for crosswalk purposes.
///
/// Without a tolerance this is exact float equality.
pub fn is_crosswalk_match(work: f64, target: f64, tolerance: Option<f64>) -> bool {
    match tolerance {
        Some(tol) => (work - target).abs() <= tol,
        None => work == target,
    }
}

/// Derive every refinement statistic from scratch.
///
/// Ratios and the below-target count use the RUC values; crosswalks match
/// the CMS work value.
#[instrument(skip_all, fields(hcpcs = %record.hcpcs))]
pub fn compute(
    record: &CodeRecord,
    proposed: &ProposedValues,
    split: &PopulationSplit,
    crosswalk_tolerance: Option<f64>,
) -> RefinementResult {
    let ruc = &proposed.ruc;
    let time_ratio = time_ratio(ruc.tt, record.current_tt);
    let intensity_ratio = intensity_ratio(ruc.ist, record.current_ist);

    let quartile_work = split.quartile_work();
    let below_target_count = quartile_work.iter().filter(|&&w| w < ruc.work).count();
    let crosswalk_candidates: Vec<CodeRecord> = split
        .quartile
        .iter()
        .filter(|r| is_crosswalk_match(r.current_work, proposed.cms.work, crosswalk_tolerance))
        .cloned()
        .collect();

    debug!(
        time_ratio,
        intensity_ratio,
        below_target_count,
        crosswalks = crosswalk_candidates.len(),
        "Computed refinement statistics"
    );

    RefinementResult {
        time_ratio,
        time_ratio_percent: time_ratio * 100.0,
        time_ratio_work: time_ratio * record.current_work,
        intensity_ratio,
        intensity_ratio_work: intensity_ratio * record.current_work,
        population_count: split.population.len(),
        quartile_count: split.quartile.len(),
        quartile_median_work: median(&quartile_work),
        below_target_count,
        crosswalk_candidates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;
    use crate::types::ValueSet;

    fn split(quartile_work: &[f64], population: usize) -> PopulationSplit {
        let quartile: Vec<CodeRecord> = quartile_work
            .iter()
            .enumerate()
            .map(|(i, &w)| record(&format!("Q{}", i), 30.0, 20.0, w))
            .collect();
        let mut members = quartile.clone();
        while members.len() < population {
            members.push(record("P", 30.0, 20.0, 99.0));
        }
        PopulationSplit {
            global_value: "090".to_string(),
            population: members,
            work_percentile: quartile_work.iter().copied().reduce(f64::max),
            quartile,
        }
    }

    fn proposed(tt: f64, ist: f64, ruc_work: f64, cms_work: f64) -> ProposedValues {
        let ruc = ValueSet { tt, ist, work: ruc_work, preservice: 0.0, postservice: 0.0 };
        ProposedValues { ruc, cms: ValueSet { work: cms_work, ..ruc } }
    }

    #[test]
    fn time_ratio_scenario() {
        let current = record("A", 30.0, 20.0, 2.0);
        let result = compute(&current, &proposed(33.0, 20.0, 2.0, 2.0), &split(&[1.0], 4), None);
        assert_eq!(result.time_ratio, 1.1);
        assert!((result.time_ratio_percent - 110.0).abs() < 1e-9);
        assert!((result.time_ratio_work - 2.2).abs() < 1e-9);
        assert_eq!(result.intensity_ratio, 1.0);
        assert_eq!(result.intensity_ratio_work, 2.0);
        assert_eq!(result.population_count, 4);
    }

    #[test]
    fn zero_current_times_give_zero_ratios() {
        let current = record("A", 0.0, 0.0, 2.0);
        let result = compute(&current, &proposed(33.0, 12.0, 2.0, 2.0), &split(&[], 0), None);
        assert_eq!(result.time_ratio, 0.0);
        assert_eq!(result.intensity_ratio, 0.0);
        assert_eq!(result.time_ratio_work, 0.0);
    }

    #[test]
    fn quartile_statistics() {
        let current = record("A", 30.0, 20.0, 2.0);
        let result = compute(&current, &proposed(30.0, 20.0, 1.5, 1.2), &split(&[1.0, 1.2, 1.5, 1.8], 16), None);
        assert_eq!(result.quartile_count, 4);
        assert!((result.quartile_median_work.unwrap() - 1.35).abs() < 1e-9);
        assert_eq!(result.below_target_count, 2);
        assert_eq!(result.crosswalk_candidates.len(), 1);
        assert_eq!(result.crosswalk_candidates[0].current_work, 1.2);
    }

    #[test]
    fn empty_population_has_null_median() {
        let current = record("A", 30.0, 20.0, 2.0);
        let result = compute(&current, &proposed(30.0, 20.0, 2.0, 2.0), &split(&[], 0), None);
        assert_eq!(result.population_count, 0);
        assert_eq!(result.quartile_median_work, None);
        assert_eq!(result.below_target_count, 0);
        assert!(result.crosswalk_candidates.is_empty());
    }

    #[test]
    fn crosswalk_tolerance_widens_matching() {
        assert!(!is_crosswalk_match(1.2000001, 1.2, None));
        assert!(is_crosswalk_match(1.2000001, 1.2, Some(1e-3)));
        assert!(is_crosswalk_match(1.2, 1.2, None));
    }
}
