use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("{table}: code '{code}' not found")]
    NotFound { table: &'static str, code: String },

    #[error("source file not found: {}", path.display())]
    SourceMissing { path: PathBuf },

    #[error("schema mismatch in {source_name}: {detail}")]
    Schema { source_name: String, detail: String },

    #[error("no reference codes matched the search window for global value '{global_value}'")]
    EmptyPopulation { global_value: String },

    #[error("invalid search window: {0}")]
    InvalidWindow(String),

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet read failed for {}: {message}", path.display())]
    Spreadsheet { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ReviewError {
    pub fn schema(source_name: impl Into<String>, detail: impl Into<String>) -> Self {
        ReviewError::Schema {
            source_name: source_name.into(),
            detail: detail.into(),
        }
    }

    pub fn not_found(table: &'static str, code: impl Into<String>) -> Self {
        ReviewError::NotFound {
            table,
            code: code.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReviewError>;
