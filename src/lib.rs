pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod review;
pub mod sources;
pub mod storage;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{Result, ReviewError};
pub use review::{ReviewReport, ReviewSession, SessionStore};
pub use storage::{InMemoryStorage, Storage};
