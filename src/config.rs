// src/config.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::process::coerce::{
    ColumnTypeSpec, DEFAULT_DATE_COLUMNS, DEFAULT_NULLABLE_INT_COLUMNS, DEFAULT_TEXT_COLUMNS,
};

pub const DEFAULT_OUTPUT_PREFIX: &str = "outputfolder";
pub const DEFAULT_CRAWLER_NAME: &str = "superstore_etl_pipeline_crawler";

/// Converter settings. Every field has a default, so an empty YAML document
/// is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory, inside the source container, that receives the Parquet files.
    pub output_prefix: String,
    /// Catalog refresh job started after each write.
    pub crawler_name: String,
    /// Base URL of the catalog service. Without one the refresh is only logged.
    pub catalog_endpoint: Option<String>,
    pub columns: ColumnRules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            crawler_name: DEFAULT_CRAWLER_NAME.to_string(),
            catalog_endpoint: None,
            columns: ColumnRules::default(),
        }
    }
}

/// Canonical column names per coercion rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnRules {
    pub date: Vec<String>,
    pub text: Vec<String>,
    pub nullable_int: Vec<String>,
}

impl Default for ColumnRules {
    fn default() -> Self {
        let owned =
            |names: &[&str]| -> Vec<String> { names.iter().map(|s| s.to_string()).collect() };
        Self {
            date: owned(DEFAULT_DATE_COLUMNS),
            text: owned(DEFAULT_TEXT_COLUMNS),
            nullable_int: owned(DEFAULT_NULLABLE_INT_COLUMNS),
        }
    }
}

impl Config {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(text).context("parsing YAML config")?;
        // surface rule conflicts at load time rather than per invocation
        cfg.column_types()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("loading config {}", path.display()))
    }

    /// The validated coercion table for these rules.
    pub fn column_types(&self) -> Result<ColumnTypeSpec> {
        let c = &self.columns;
        ColumnTypeSpec::from_sets(
            c.date.as_slice(),
            c.text.as_slice(),
            c.nullable_int.as_slice(),
        )
        .context("invalid column rules")
    }
}
