//! Engine configuration
//!
//! Every threshold in the engine (change percentages, the z-score cutoff,
//! concentration floors, tolerance bands) is an inferred default rather than
//! a confirmed contract, so all of them are file-tunable. Missing keys and
//! a missing file both fall back to the built-in defaults.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::anomaly::AnomalyConfig;
use crate::error::{Error, Result};
use crate::forecast::ForecastConfig;
use crate::insights::generator::InsightConfig;
use crate::recommend::RecommendationConfig;
use crate::recurring::RecurringConfig;

/// Aggregated configuration for the whole analysis pipeline
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub recurring: RecurringConfig,
    pub anomaly: AnomalyConfig,
    pub forecast: ForecastConfig,
    pub insights: InsightConfig,
    pub recommendations: RecommendationConfig,
}

impl EngineConfig {
    /// Load overrides from a TOML file. A missing file is not an error:
    /// defaults apply.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config override, using defaults");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.recurring.min_occurrences == 0 {
            return Err(Error::Config(
                "recurring.min_occurrences must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.recurring.interval_consistency) {
            return Err(Error::Config(
                "recurring.interval_consistency must be between 0 and 1".to_string(),
            ));
        }
        if self.anomaly.z_score_threshold <= 0.0 {
            return Err(Error::Config(
                "anomaly.z_score_threshold must be positive".to_string(),
            ));
        }
        if self.insights.min_months < 2 {
            return Err(Error::Config(
                "insights.min_months must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.recurring.min_occurrences, 3);
        assert_eq!(config.anomaly.z_score_threshold, 2.0);
        assert_eq!(config.insights.change_threshold_percent, 20.0);
        assert_eq!(config.recommendations.concentration_share_percent, 40.0);
        assert_eq!(config.forecast.max_horizon_months, 24);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
[anomaly]
z_score_threshold = 2.5

[insights]
change_threshold_percent = 25.0
"#,
        )
        .unwrap();

        assert_eq!(config.anomaly.z_score_threshold, 2.5);
        assert_eq!(config.insights.change_threshold_percent, 25.0);
        // Untouched sections keep defaults
        assert_eq!(config.anomaly.min_history, 5);
        assert_eq!(config.recurring.monthly_tolerance_days, 5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_toml_str("[anomaly]\nz_score_threshold = 0.0\n").unwrap_err();
        assert!(err.to_string().contains("z_score_threshold"));

        let err =
            EngineConfig::from_toml_str("[recurring]\nmin_occurrences = 0\n").unwrap_err();
        assert!(err.to_string().contains("min_occurrences"));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(EngineConfig::from_toml_str("not toml at all [").is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = EngineConfig::load(Path::new("/nonexistent/finsight.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
