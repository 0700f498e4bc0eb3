use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::session::ReviewSession;
use crate::constants::PROFILE_AXES;
use crate::pipeline::{DirectExpense, RefinementResult};
use crate::sources::SourceProvenance;
use crate::types::{AllowableBounds, CodeRecord, RvuRecord, SearchWindow, StageValues};

/// Structured output of a review, consumed by renderers and the CLI
#[derive(Debug, Clone, Serialize)]
pub struct ReviewReport {
    pub session_id: Uuid,
    pub revision: u32,
    pub generated_at: DateTime<Utc>,
    pub record: CodeRecord,
    pub direct_expense: Option<DirectExpense>,
    pub rvu_rows: Vec<RvuRecord>,
    pub window: SearchWindow,
    pub allowable: AllowableBounds,
    pub work_percentile: Option<f64>,
    pub population: Vec<CodeRecord>,
    pub quartile: Vec<CodeRecord>,
    pub refinement: RefinementResult,
    pub stages: StageValues,
    pub charts: ChartData,
    pub sources: Vec<SourceProvenance>,
}

impl ReviewReport {
    pub fn from_session(session: &ReviewSession, sources: Vec<SourceProvenance>) -> Self {
        let stages = session.stages();
        Self {
            session_id: session.id,
            revision: session.revision,
            generated_at: Utc::now(),
            record: session.record.clone(),
            direct_expense: session.direct_expense.clone(),
            rvu_rows: session.rvu_rows.clone(),
            window: session.window,
            allowable: session.window.allowable,
            work_percentile: session.split.work_percentile,
            population: session.split.population.clone(),
            quartile: session.split.quartile.clone(),
            refinement: session.refinement.clone(),
            charts: ChartData::from_stages(&stages),
            stages,
            sources,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadialSeries {
    pub name: String,
    pub axes: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarPoint {
    pub category: String,
    pub group: String,
    pub value: f64,
}

/// Series for the radial profile and grouped bar charts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub radial: Vec<RadialSeries>,
    /// Upper end of the radial axis: the largest of all plotted values
    pub radial_max: f64,
    pub bars: Vec<BarPoint>,
}

impl ChartData {
    pub fn from_stages(stages: &StageValues) -> Self {
        let labelled = stages.labelled();
        let axes: Vec<String> = PROFILE_AXES.iter().map(|a| a.to_string()).collect();

        let radial: Vec<RadialSeries> = labelled
            .iter()
            .map(|(name, values)| RadialSeries {
                name: name.to_string(),
                axes: axes.clone(),
                values: values.profile().to_vec(),
            })
            .collect();

        let bars: Vec<BarPoint> = labelled
            .iter()
            .flat_map(|(group, values)| {
                values.axis_values().into_iter().map(move |(category, value)| BarPoint {
                    category: category.to_string(),
                    group: group.to_string(),
                    value,
                })
            })
            .collect();

        let radial_max = bars.iter().map(|b| b.value).fold(0.0, f64::max);

        Self {
            radial,
            radial_max,
            bars,
        }
    }
}
