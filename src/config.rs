//! Job configuration.
//!
//! Uses `figment` for layered configuration: defaults -> TOML file ->
//! environment -> CLI overrides. The file is the `--config` path, or
//! `hotel-etl.toml` in the working directory when it exists. Environment
//! variables use the `HOTEL_ETL_` prefix with `__` between nested keys
//! (`HOTEL_ETL_WAREHOUSE__FORMAT=csv`).

use crate::keys::KeyStrategy;
use crate::runner::{ExecMode, Runner};
use crate::validation::ValidationMode;
use crate::warehouse::{RetryPolicy, TableFormat};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File picked up when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "hotel-etl.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EtlConfig {
    pub source: SourceConfig,
    pub cleaning: CleaningConfig,
    pub warehouse: WarehouseConfig,
    pub execution: ExecutionConfig,
    pub validation: ValidationConfig,
    pub keys: KeysConfig,
    /// Where to save the JSON run report; no report file when unset.
    pub report_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    pub path: PathBuf,
    /// Single-byte field delimiter.
    pub delimiter: char,
    /// Rows sampled for type inference; all rows when unset.
    pub infer_sample_rows: Option<usize>,
    /// Cell texts read as null in addition to the empty cell.
    pub null_values: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/hotel_dataset.csv"),
            delimiter: ',',
            infer_sample_rows: None,
            null_values: vec![String::new()],
        }
    }
}

/// How `Review_Date` text such as `8/3/2017` is read.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DateOrder {
    /// `M-d-yyyy`
    #[default]
    MonthFirst,
    /// `d-M-yyyy`
    DayFirst,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CleaningConfig {
    pub date_order: DateOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WarehouseConfig {
    pub root: PathBuf,
    pub schema: String,
    pub format: TableFormat,
    /// Create `<root>/<schema>.db` when missing instead of failing.
    pub create_schema: bool,
    pub retry: RetryPolicy,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("warehouse"),
            schema: "hotel_reviews".to_string(),
            format: TableFormat::default(),
            create_schema: false,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionKind {
    Sequential,
    #[default]
    Parallel,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionConfig {
    pub mode: ExecutionKind,
    pub threads: Option<usize>,
    pub partitions: Option<usize>,
}

impl ExecutionConfig {
    pub fn runner(&self) -> Runner {
        let mode = match self.mode {
            ExecutionKind::Sequential => ExecMode::Sequential,
            ExecutionKind::Parallel => ExecMode::Parallel {
                threads: self.threads,
                partitions: self.partitions,
            },
        };
        Runner::new(mode)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    pub mode: ValidationMode,
    /// Largest tolerated share of input rows dropped by cleaning, in `[0, 1]`.
    pub max_dropped_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeysConfig {
    pub strategy: KeyStrategy,
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (a figment merged last, usually built from CLI flags)
/// 2. Environment variables (prefixed with `HOTEL_ETL_`)
/// 3. `config_file`, or `hotel-etl.toml` if present
/// 4. Built-in defaults
///
/// # Errors
/// Fails if an explicit `config_file` does not exist or any layer holds a
/// value of the wrong shape.
pub fn load_config(
    config_file: Option<&Path>,
    overrides: Option<Figment>,
) -> Result<EtlConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(EtlConfig::default()));

    match config_file {
        Some(path) => {
            if !path.exists() {
                return Err(Box::new(figment::Error::from(format!(
                    "config file {} does not exist",
                    path.display()
                ))));
            }
            figment = figment.merge(Toml::file(path));
        }
        None => {
            let local = Path::new(DEFAULT_CONFIG_FILE);
            if local.exists() {
                figment = figment.merge(Toml::file(local));
            }
        }
    }

    figment = figment.merge(Env::prefixed("HOTEL_ETL_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(overrides);
    }

    figment.extract().map_err(Box::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_job() {
        let cfg = EtlConfig::default();
        assert_eq!(cfg.source.path, PathBuf::from("data/hotel_dataset.csv"));
        assert_eq!(cfg.warehouse.schema, "hotel_reviews");
        assert_eq!(cfg.warehouse.format, TableFormat::Parquet);
        assert_eq!(cfg.cleaning.date_order, DateOrder::MonthFirst);
        assert_eq!(cfg.validation.mode, ValidationMode::FailFast);
        assert!(!cfg.warehouse.create_schema);
    }

    #[test]
    fn file_and_override_layers_win_over_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("job.toml");
        std::fs::write(
            &path,
            r#"
            [warehouse]
            schema = "staging_reviews"
            format = "csv"

            [execution]
            mode = "sequential"
            "#,
        )?;

        let overrides = Figment::new().merge(Serialized::default("cleaning.date_order", "day-first"));
        let cfg = load_config(Some(&path), Some(overrides)).map_err(|e| anyhow::anyhow!("{e}"))?;
        assert_eq!(cfg.warehouse.schema, "staging_reviews");
        assert_eq!(cfg.warehouse.format, TableFormat::Csv);
        assert_eq!(cfg.execution.mode, ExecutionKind::Sequential);
        assert_eq!(cfg.cleaning.date_order, DateOrder::DayFirst);
        Ok(())
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml")), None).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
