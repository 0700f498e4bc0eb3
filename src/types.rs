use serde::{Deserialize, Serialize};

use crate::constants::{PROFILE_AXES, STAGE_CMS, STAGE_CURRENT, STAGE_RUC};

/// One billing code's canonical attributes from the reference table.
///
/// Records with a non-positive work value never make it out of the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRecord {
    pub hcpcs: String,
    pub description: String,
    pub global_value: String,
    pub current_work: f64,
    pub current_tt: f64,
    pub current_ist: f64,
    pub current_preservice: f64,
    pub current_postservice: f64,
    pub components: TimeComponents,
    pub descriptors: CodeDescriptors,
}

/// Pre and post service sub-fields the composite times are derived from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeComponents {
    pub pre_time_package: f64,
    pub pre_eval_time: f64,
    pub pre_positioning_time: f64,
    pub pre_scrub_dress_wait_time: f64,
    pub immediate_post_time: f64,
    pub post_visit_time: f64,
    pub hospital_postop_visits: f64,
    pub office_postop_visits: f64,
}

/// Descriptive columns carried through from the reference table as-is
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeDescriptors {
    pub non_facility_total_rvu: Option<f64>,
    pub facility_total_rvu: Option<f64>,
    pub iwput: Option<f64>,
    pub time_source: Option<String>,
    pub last_ruc_review: Option<String>,
    pub top_specialty: Option<String>,
    pub mpc: Option<String>,
    pub vignette: Option<String>,
    pub medicare_utilization: Option<f64>,
    pub medicare_allowed_charges: Option<f64>,
}

/// The five values compared across review stages
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueSet {
    pub tt: f64,
    pub ist: f64,
    pub work: f64,
    pub preservice: f64,
    pub postservice: f64,
}

impl ValueSet {
    pub fn current(record: &CodeRecord) -> Self {
        Self {
            tt: record.current_tt,
            ist: record.current_ist,
            work: record.current_work,
            preservice: record.current_preservice,
            postservice: record.current_postservice,
        }
    }

    /// Values in `PROFILE_AXES` order
    pub fn profile(&self) -> [f64; 5] {
        [self.tt, self.ist, self.work, self.preservice, self.postservice]
    }

    pub fn axis_values(&self) -> Vec<(&'static str, f64)> {
        PROFILE_AXES.iter().copied().zip(self.profile()).collect()
    }
}

/// RUC-recommended and CMS-final values under review.
///
/// Time ratios and the below-target count use the RUC stage; crosswalk
/// matching uses the CMS stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProposedValues {
    pub ruc: ValueSet,
    pub cms: ValueSet,
}

impl ProposedValues {
    /// RUC defaults to the current values and CMS defaults to RUC
    pub fn defaults_for(record: &CodeRecord) -> Self {
        let current = ValueSet::current(record);
        Self {
            ruc: current,
            cms: current,
        }
    }
}

/// Current, RUC and CMS value sets side by side
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageValues {
    pub current: ValueSet,
    pub ruc: ValueSet,
    pub cms: ValueSet,
}

impl StageValues {
    pub fn new(record: &CodeRecord, proposed: &ProposedValues) -> Self {
        Self {
            current: ValueSet::current(record),
            ruc: proposed.ruc,
            cms: proposed.cms,
        }
    }

    pub fn labelled(&self) -> [(&'static str, &ValueSet); 3] {
        [
            (STAGE_CURRENT, &self.current),
            (STAGE_RUC, &self.ruc),
            (STAGE_CMS, &self.cms),
        ]
    }
}

/// Slider limits for the search window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllowableBounds {
    pub time_min: f64,
    pub time_max: f64,
    pub intraservice_min: f64,
    pub intraservice_max: f64,
}

/// Inclusive time bounds used to select the comparison population
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchWindow {
    pub time_lower: f64,
    pub time_upper: f64,
    pub intraservice_lower: f64,
    pub intraservice_upper: f64,
    pub allowable: AllowableBounds,
}

impl SearchWindow {
    pub fn contains(&self, record: &CodeRecord) -> bool {
        record.current_tt >= self.time_lower
            && record.current_tt <= self.time_upper
            && record.current_ist >= self.intraservice_lower
            && record.current_ist <= self.intraservice_upper
    }

    pub fn with_time(mut self, lower: f64, upper: f64) -> Self {
        self.time_lower = lower;
        self.time_upper = upper;
        self
    }

    pub fn with_intraservice(mut self, lower: f64, upper: f64) -> Self {
        self.intraservice_lower = lower;
        self.intraservice_upper = upper;
        self
    }
}

/// Facility and non-facility contribution of one expense line or table
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectExpenseTotals {
    pub facility_total: f64,
    pub non_facility_total: f64,
}

impl std::ops::Add for DirectExpenseTotals {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            facility_total: self.facility_total + other.facility_total,
            non_facility_total: self.non_facility_total + other.non_facility_total,
        }
    }
}

impl std::iter::Sum for DirectExpenseTotals {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, item| acc + item)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseKind {
    Supply,
    Equipment,
    Labor,
}

/// A supply, equipment or labor line with its computed contributions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseLineItem {
    pub hcpcs: String,
    pub kind: ExpenseKind,
    pub item_code: Option<String>,
    pub description: Option<String>,
    pub facility_contrib: f64,
    pub non_facility_contrib: f64,
}

/// One row of the relative-value file (one per code and modifier)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RvuRecord {
    pub hcpcs: String,
    pub modifier: String,
    pub description: String,
    pub status_code: String,
    pub work_rvu: f64,
    pub nf_pe_rvu: f64,
    pub f_pe_rvu: f64,
    pub mp_rvu: f64,
    pub nf_total: f64,
    pub f_total: f64,
    pub glob_days: String,
    pub pre_op: f64,
    pub intra_op: f64,
    pub post_op: f64,
    pub endo_base: String,
    pub conv_factor: f64,
    /// Payment policy indicators keyed by column name
    pub indicators: std::collections::BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;

    #[test]
    fn window_bounds_are_inclusive() {
        let window = SearchWindow {
            time_lower: 25.0,
            time_upper: 35.0,
            intraservice_lower: 20.0,
            intraservice_upper: 20.0,
            allowable: AllowableBounds {
                time_min: 0.0,
                time_max: 60.0,
                intraservice_min: 0.0,
                intraservice_max: 40.0,
            },
        };

        assert!(window.contains(&record("A", 25.0, 20.0, 1.0)));
        assert!(window.contains(&record("B", 35.0, 20.0, 1.0)));
        assert!(!window.contains(&record("C", 35.5, 20.0, 1.0)));
        assert!(!window.contains(&record("D", 30.0, 21.0, 1.0)));
    }

    #[test]
    fn proposed_defaults_mirror_current_values() {
        let mut rec = record("A", 30.0, 20.0, 2.0);
        rec.current_preservice = 7.0;
        let proposed = ProposedValues::defaults_for(&rec);
        assert_eq!(proposed.ruc, ValueSet::current(&rec));
        assert_eq!(proposed.cms, proposed.ruc);
        assert_eq!(proposed.ruc.profile(), [30.0, 20.0, 2.0, 7.0, 0.0]);
    }

    #[test]
    fn expense_totals_sum_per_setting() {
        let totals: DirectExpenseTotals = [
            DirectExpenseTotals { facility_total: 1.5, non_facility_total: 2.0 },
            DirectExpenseTotals { facility_total: 0.5, non_facility_total: 3.0 },
        ]
        .into_iter()
        .sum();
        assert_eq!(totals.facility_total, 2.0);
        assert_eq!(totals.non_facility_total, 5.0);
    }
}
