use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::*;
use crate::error::{Result, ReviewError};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sources: SourcesConfig,
    pub search: SearchConfig,
    pub review: ReviewConfig,
    pub logging: LoggingConfig,
}

/// Where the five source tables live
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub data_dir: PathBuf,
    pub reference: String,
    pub supply: String,
    pub equipment: String,
    pub labor: String,
    pub rvu: String,
    pub rvu_header_skip: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Half-width of the default total time window
    pub time_offset: f64,
    /// Floor for the default lower total time bound
    pub min_time_lower: f64,
    /// Allowable maxima are this multiple of the current times
    pub allowable_multiplier: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Absolute tolerance for crosswalk matching; `None` means exact equality
    pub crosswalk_tolerance: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_prefix: String,
    pub json_file: bool,
    pub default_directive: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            reference: DEFAULT_REFERENCE_FILE.to_string(),
            supply: DEFAULT_SUPPLY_FILE.to_string(),
            equipment: DEFAULT_EQUIPMENT_FILE.to_string(),
            labor: DEFAULT_LABOR_FILE.to_string(),
            rvu: DEFAULT_RVU_FILE.to_string(),
            rvu_header_skip: DEFAULT_RVU_HEADER_SKIP,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            time_offset: DEFAULT_TIME_OFFSET,
            min_time_lower: DEFAULT_MIN_TIME_LOWER,
            allowable_multiplier: DEFAULT_ALLOWABLE_MULTIPLIER,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_prefix: "rvu_review.log".to_string(),
            json_file: true,
            default_directive: "rvu_review=info".to_string(),
        }
    }
}

impl SourcesConfig {
    pub fn reference_path(&self) -> PathBuf {
        self.data_dir.join(&self.reference)
    }

    pub fn supply_path(&self) -> PathBuf {
        self.data_dir.join(&self.supply)
    }

    pub fn equipment_path(&self) -> PathBuf {
        self.data_dir.join(&self.equipment)
    }

    pub fn labor_path(&self) -> PathBuf {
        self.data_dir.join(&self.labor)
    }

    pub fn rvu_path(&self) -> PathBuf {
        self.data_dir.join(&self.rvu)
    }
}

impl Config {
    /// Load configuration from an explicit path, `RVU_REVIEW_CONFIG`, or the default file.
    ///
    /// An explicit or env-provided path must exist. The default file is optional and
    /// built-in defaults are used when it is absent. Environment overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let env_path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let mut config = match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    debug!("No {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                    Config::default()
                }
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(path).map_err(|e| {
            ReviewError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            self.sources.data_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var(LOG_DIR_ENV) {
            self.logging.directory = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let search = &self.search;
        if !(search.time_offset.is_finite() && search.time_offset >= 0.0) {
            return Err(ReviewError::Config(format!(
                "search.time_offset must be a non-negative number, got {}",
                search.time_offset
            )));
        }
        if !(search.allowable_multiplier.is_finite() && search.allowable_multiplier >= 1.0) {
            return Err(ReviewError::Config(format!(
                "search.allowable_multiplier must be at least 1.0, got {}",
                search.allowable_multiplier
            )));
        }
        if let Some(tolerance) = self.review.crosswalk_tolerance {
            if !(tolerance.is_finite() && tolerance >= 0.0) {
                return Err(ReviewError::Config(format!(
                    "review.crosswalk_tolerance must be a non-negative number, got {}",
                    tolerance
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_review_layout() {
        let config = Config::default();
        assert_eq!(config.sources.reference_path(), PathBuf::from("raw_data/raw.csv"));
        assert_eq!(config.sources.rvu_header_skip, 12);
        assert_eq!(config.search.time_offset, 5.0);
        assert!(config.review.crosswalk_tolerance.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[sources]\ndata_dir = \"/srv/pfs\"\n\n[review]\ncrosswalk_tolerance = 0.005"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.sources.data_dir, PathBuf::from("/srv/pfs"));
        assert_eq!(config.sources.supply, "supply.xlsx");
        assert_eq!(config.review.crosswalk_tolerance, Some(0.005));
        assert_eq!(config.search.allowable_multiplier, 2.0);
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let mut config = Config::default();
        config.review.crosswalk_tolerance = Some(-1.0);
        assert!(matches!(config.validate(), Err(ReviewError::Config(_))));
    }

    #[test]
    fn missing_explicit_file_is_a_config_error() {
        let result = Config::from_file(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(ReviewError::Config(_))));
    }
}
