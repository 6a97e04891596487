use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Engine tunables. Every section is optional; an empty document is valid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub patients: PatientsConfig,
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsConfig {
    /// Number of fixed-width bins in the charge histogram.
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,
    /// Length of each top-patients ranking.
    #[serde(default = "default_top_patients")]
    pub top_patients: usize,
}

fn default_histogram_bins() -> usize {
    10
}

fn default_top_patients() -> usize {
    20
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            histogram_bins: default_histogram_bins(),
            top_patients: default_top_patients(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaginationConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Larger requested limits are clamped to this.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

fn default_limit() -> usize {
    50
}

fn default_max_limit() -> usize {
    1000
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

// ---------------------------------------------------------------------------
// Patients
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientsConfig {
    /// CSV with `patient_id,name` columns. Relative paths resolve against the config file.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl EngineConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: EngineConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file, resolving the patients file against its directory.
    pub fn load(path: &Path) -> Result<Self, ReconError> {
        let input = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&input)?;
        if let Some(file) = config.patients.file.take() {
            let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
            config.patients.file = Some(base_dir.join(file));
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.analytics.histogram_bins == 0 {
            return Err(ReconError::ConfigValidation(
                "analytics.histogram_bins must be at least 1".into(),
            ));
        }
        if self.analytics.top_patients == 0 {
            return Err(ReconError::ConfigValidation(
                "analytics.top_patients must be at least 1".into(),
            ));
        }
        if self.pagination.max_limit == 0 {
            return Err(ReconError::ConfigValidation(
                "pagination.max_limit must be at least 1".into(),
            ));
        }
        if self.pagination.default_limit == 0
            || self.pagination.default_limit > self.pagination.max_limit
        {
            return Err(ReconError::ConfigValidation(format!(
                "pagination.default_limit must be between 1 and max_limit ({}), got {}",
                self.pagination.max_limit, self.pagination.default_limit
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
