/// Source table names used in errors, logs and provenance
pub const REFERENCE_TABLE: &str = "reference";
pub const SUPPLY_TABLE: &str = "supply";
pub const EQUIPMENT_TABLE: &str = "equipment";
pub const LABOR_TABLE: &str = "labor";
pub const RVU_TABLE: &str = "rvu";

// Default file layout under the data directory
pub const DEFAULT_DATA_DIR: &str = "raw_data";
pub const DEFAULT_REFERENCE_FILE: &str = "raw.csv";
pub const DEFAULT_SUPPLY_FILE: &str = "supply.xlsx";
pub const DEFAULT_EQUIPMENT_FILE: &str = "equip.xlsx";
pub const DEFAULT_LABOR_FILE: &str = "labor.xlsx";
pub const DEFAULT_RVU_FILE: &str = "rvu.csv";

/// Preamble lines ahead of the relative-value table's header row
pub const DEFAULT_RVU_HEADER_SKIP: usize = 12;

// Search window defaults
pub const DEFAULT_TIME_OFFSET: f64 = 5.0;
pub const DEFAULT_MIN_TIME_LOWER: f64 = 1.0;
pub const DEFAULT_ALLOWABLE_MULTIPLIER: f64 = 2.0;

/// Work value percentile that bounds the comparison quartile
pub const QUARTILE_PERCENTILE: f64 = 25.0;

// Configuration and environment
pub const DEFAULT_CONFIG_FILE: &str = "rvu_review.toml";
pub const CONFIG_PATH_ENV: &str = "RVU_REVIEW_CONFIG";
pub const DATA_DIR_ENV: &str = "RVU_REVIEW_DATA_DIR";
pub const LOG_DIR_ENV: &str = "RVU_REVIEW_LOG_DIR";

/// Value-set stage labels, in chart order
pub const STAGE_CURRENT: &str = "current";
pub const STAGE_RUC: &str = "RUC";
pub const STAGE_CMS: &str = "CMS";

/// Profile axes shared by the radial and grouped bar charts
pub const PROFILE_AXES: [&str; 5] = ["tt", "ist", "work", "preservice", "postservice"];

/// Spreadsheet extensions read through calamine; anything else is read as CSV
pub const SPREADSHEET_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];
