use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::DEFAULT_SENTINEL_YEAR;
use crate::error::{EtlError, Result};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "etl.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub dates: DatePolicy,
    pub rebase: RebaseConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Raw extract of chain ABC
    pub abc_source: PathBuf,
    /// Raw extract of chain XYZ
    pub xyz_source: PathBuf,
    /// Cleaned CSVs and SQLite stores
    pub data_dir: PathBuf,
    /// Analytics, report and metrics snapshot
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
}

/// How suspicious dates are treated during `repair_dates`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatePolicy {
    /// Year the source system writes when a date write failed
    pub sentinel_year: i32,
    pub plausible_min_year: i32,
    pub plausible_max_year: i32,
    /// Reset non-sentinel dates outside the plausible range to unknown.
    /// When false they are only counted in the quality report.
    pub reset_implausible_dates: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RebaseConfig {
    pub year_shift: i32,
    pub abc_growth_rate: f64,
    pub xyz_growth_rate: f64,
    pub delivery_uplift: f64,
    /// Appended to the chain name when regenerating customer ids
    pub customer_id_suffix: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub top_products: usize,
    pub top_states: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            dates: DatePolicy::default(),
            rebase: RebaseConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            abc_source: PathBuf::from("raw/ABC.csv"),
            xyz_source: PathBuf::from("raw/XYZ.csv"),
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("outputs"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl Default for DatePolicy {
    fn default() -> Self {
        Self {
            sentinel_year: DEFAULT_SENTINEL_YEAR,
            plausible_min_year: 2015,
            plausible_max_year: 2035,
            reset_implausible_dates: false,
        }
    }
}

impl Default for RebaseConfig {
    fn default() -> Self {
        Self {
            year_shift: 6,
            abc_growth_rate: 0.08,
            xyz_growth_rate: 0.07,
            delivery_uplift: 0.05,
            customer_id_suffix: "2024".to_string(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_products: 5,
            top_states: 5,
        }
    }
}

impl DatePolicy {
    pub fn is_plausible_year(&self, year: i32) -> bool {
        (self.plausible_min_year..=self.plausible_max_year).contains(&year)
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `etl.toml` is used when present
    /// and built-in defaults otherwise. `ETL_DATA_DIR`, `ETL_OUTPUT_DIR` and
    /// `ETL_LOG_DIR` (also read from `.env`) override the file.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = match explicit_path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };

        if let Ok(dir) = std::env::var("ETL_DATA_DIR") {
            config.paths.data_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("ETL_OUTPUT_DIR") {
            config.paths.output_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("ETL_LOG_DIR") {
            config.paths.log_dir = PathBuf::from(dir);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dates.plausible_min_year > self.dates.plausible_max_year {
            return Err(EtlError::Config(format!(
                "plausible_min_year {} is after plausible_max_year {}",
                self.dates.plausible_min_year, self.dates.plausible_max_year
            )));
        }
        for (name, rate) in [
            ("abc_growth_rate", self.rebase.abc_growth_rate),
            ("xyz_growth_rate", self.rebase.xyz_growth_rate),
            ("delivery_uplift", self.rebase.delivery_uplift),
        ] {
            if !rate.is_finite() || rate <= -1.0 {
                return Err(EtlError::Config(format!("{} must be a finite rate above -1, got {}", name, rate)));
            }
        }
        Ok(())
    }

    pub fn abc_clean_path(&self) -> PathBuf {
        self.paths.data_dir.join(crate::constants::ABC_CLEAN_FILE)
    }

    pub fn xyz_clean_path(&self) -> PathBuf {
        self.paths.data_dir.join(crate::constants::XYZ_CLEAN_FILE)
    }

    pub fn merged_clean_path(&self) -> PathBuf {
        self.paths.data_dir.join(crate::constants::MERGED_CLEAN_FILE)
    }

    pub fn cleaning_log_path(&self) -> PathBuf {
        self.paths.data_dir.join(crate::constants::CLEANING_LOG_FILE)
    }

    pub fn database_path(&self) -> PathBuf {
        self.paths.data_dir.join(crate::constants::DATABASE_FILE)
    }

    pub fn rebased_database_path(&self) -> PathBuf {
        self.paths.data_dir.join(crate::constants::REBASED_DATABASE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [paths]
            data_dir = "scratch"

            [dates]
            reset_implausible_dates = true
            "#,
        )
        .unwrap();

        assert_eq!(config.paths.data_dir, PathBuf::from("scratch"));
        assert_eq!(config.paths.output_dir, PathBuf::from("outputs"));
        assert_eq!(config.dates.sentinel_year, 1970);
        assert!(config.dates.reset_implausible_dates);
        assert_eq!(config.rebase.year_shift, 6);
    }

    #[test]
    fn test_inverted_plausible_range_is_rejected() {
        let mut config = Config::default();
        config.dates.plausible_min_year = 2030;
        config.dates.plausible_max_year = 2020;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Config::load(Some(Path::new("/definitely/not/here/etl.toml")));
        assert!(matches!(result, Err(EtlError::Config(_))));
    }
}
