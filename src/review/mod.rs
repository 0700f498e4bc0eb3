//! Review sessions and the structured report built from them

pub mod briefing;
pub mod report;
pub mod session;
pub mod store;

pub use report::{ChartData, ReviewReport};
pub use session::ReviewSession;
pub use store::SessionStore;
