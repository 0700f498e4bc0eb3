// Review engine: direct expense, intensity lookup, population filter and refinement statistics

pub mod direct_expense;
pub mod intensity;
pub mod population;
pub mod refinement;
pub mod stats;

pub use direct_expense::{DirectExpense, DirectExpenseCalculator};
pub use intensity::{derive_default_window, lookup, validate_window};
pub use population::{filter, PopulationSplit};
pub use refinement::{compute as refine, RefinementResult};
