use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Result, ReviewError};
use crate::metrics::ReviewMetrics;
use crate::pipeline::{
    derive_default_window, filter, lookup, refine, validate_window, DirectExpense,
    DirectExpenseCalculator, PopulationSplit, RefinementResult,
};
use crate::storage::Storage;
use crate::types::{CodeRecord, ProposedValues, RvuRecord, SearchWindow, StageValues};

/// Immutable snapshot of one code review.
///
/// Every change produces a new session with all dependent stages recomputed.
/// Derived sessions keep the id and bump `revision`.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewSession {
    pub id: Uuid,
    pub revision: u32,
    pub updated_at: DateTime<Utc>,
    pub record: CodeRecord,
    /// `None` when the code has no line items in any expense table
    pub direct_expense: Option<DirectExpense>,
    pub rvu_rows: Vec<RvuRecord>,
    pub window: SearchWindow,
    pub proposed: ProposedValues,
    pub split: PopulationSplit,
    pub refinement: RefinementResult,
    pub crosswalk_tolerance: Option<f64>,
}

impl ReviewSession {
    /// Look up `hcpcs` and run every stage with the default window and proposed values
    #[instrument(skip(storage, config))]
    pub fn start<S: Storage + ?Sized>(storage: &S, config: &Config, hcpcs: &str) -> Result<Self> {
        let started = Instant::now();
        let record = lookup(storage, hcpcs)?;

        let direct_expense = match DirectExpenseCalculator::new(storage).compute(hcpcs) {
            Ok(expense) => Some(expense),
            Err(ReviewError::NotFound { .. }) => {
                warn!(hcpcs, "No direct expense line items for code");
                None
            }
            Err(e) => return Err(e),
        };
        let rvu_rows = storage.rvu_rows(hcpcs).into_iter().cloned().collect();

        let window = derive_default_window(&record, &config.search);
        let proposed = ProposedValues::defaults_for(&record);
        let tolerance = config.review.crosswalk_tolerance;
        let split = filter(storage, &record.global_value, &window);
        let refinement = refine(&record, &proposed, &split, tolerance);

        let session = Self {
            id: Uuid::new_v4(),
            revision: 0,
            updated_at: Utc::now(),
            record,
            direct_expense,
            rvu_rows,
            window,
            proposed,
            split,
            refinement,
            crosswalk_tolerance: tolerance,
        };
        ReviewMetrics::record_session(started.elapsed().as_secs_f64());
        info!(
            session_id = %session.id,
            population = session.refinement.population_count,
            quartile = session.refinement.quartile_count,
            "🩺 Started review session"
        );
        Ok(session)
    }

    /// New session with a user-adjusted window; population and refinement are recomputed.
    ///
    /// The window is checked against this session's allowable bounds, which
    /// replace whatever bounds the caller's window carries.
    pub fn with_window<S: Storage + ?Sized>(&self, storage: &S, window: SearchWindow) -> Result<Self> {
        let allowable = self.window.allowable;
        validate_window(&window, &allowable)?;
        let window = SearchWindow { allowable, ..window };
        let started = Instant::now();
        let split = filter(storage, &self.record.global_value, &window);
        let refinement = refine(&self.record, &self.proposed, &split, self.crosswalk_tolerance);

        let next = Self {
            window,
            split,
            refinement,
            ..self.successor()
        };
        ReviewMetrics::record_session(started.elapsed().as_secs_f64());
        info!(session_id = %next.id, revision = next.revision, "Search window updated");
        Ok(next)
    }

    /// New session with edited RUC/CMS values; only refinement is recomputed
    pub fn with_proposed(&self, proposed: ProposedValues) -> Self {
        let started = Instant::now();
        let refinement = refine(&self.record, &proposed, &self.split, self.crosswalk_tolerance);

        let next = Self {
            proposed,
            refinement,
            ..self.successor()
        };
        ReviewMetrics::record_session(started.elapsed().as_secs_f64());
        info!(session_id = %next.id, revision = next.revision, "Proposed values updated");
        next
    }

    pub fn stages(&self) -> StageValues {
        StageValues::new(&self.record, &self.proposed)
    }

    fn successor(&self) -> Self {
        Self {
            revision: self.revision + 1,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}
