//! Processing configuration
//!
//! Every field has a default, so an empty TOML document is a valid config.

use crate::error::StitchError;
use crate::ibi::IbiPolicy;
use crate::timestamp::{TimestampConverter, DEFAULT_TIMEZONE};
use crate::types::SeriesKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default warning threshold between consecutive files (ms)
pub const DEFAULT_WARN_GAP_MS: i64 = 40;

/// Default error threshold between consecutive files (ms)
pub const DEFAULT_ERROR_GAP_MS: i64 = 80;

/// Inter-file gap thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapThresholds {
    pub warn_gap_ms: i64,
    pub error_gap_ms: i64,
}

impl Default for GapThresholds {
    fn default() -> Self {
        Self {
            warn_gap_ms: DEFAULT_WARN_GAP_MS,
            error_gap_ms: DEFAULT_ERROR_GAP_MS,
        }
    }
}

impl GapThresholds {
    /// Create thresholds, rejecting an error threshold below the warning one
    pub fn new(warn_gap_ms: i64, error_gap_ms: i64) -> Result<Self, StitchError> {
        if error_gap_ms < warn_gap_ms {
            return Err(StitchError::InvalidThresholds {
                warn_gap_ms,
                error_gap_ms,
            });
        }
        Ok(Self {
            warn_gap_ms,
            error_gap_ms,
        })
    }
}

/// Configuration shared by the CLI and the library entry points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchConfig {
    /// IANA timezone used for instant display
    pub timezone: String,
    pub warn_gap_ms: i64,
    pub error_gap_ms: i64,
    pub ibi_policy: IbiPolicy,
    /// Filename prefix of green PPG session exports
    pub green_ppg_prefix: String,
    /// Filename prefix of heart-rate session exports
    pub heart_rate_prefix: String,
    /// Directory the day exports are written to
    pub output_dir: String,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            warn_gap_ms: DEFAULT_WARN_GAP_MS,
            error_gap_ms: DEFAULT_ERROR_GAP_MS,
            ibi_policy: IbiPolicy::Forward,
            green_ppg_prefix: "green_ppg_data".to_string(),
            heart_rate_prefix: "heart_rate_data".to_string(),
            output_dir: "data".to_string(),
        }
    }
}

impl StitchConfig {
    /// Parse a TOML document
    pub fn from_toml_str(toml_str: &str) -> Result<Self, StitchError> {
        let config: StitchConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, StitchError> {
        let content = fs::read_to_string(path).map_err(|e| {
            StitchError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Check the timezone and threshold ordering
    pub fn validate(&self) -> Result<(), StitchError> {
        self.converter()?;
        self.thresholds()?;
        Ok(())
    }

    pub fn converter(&self) -> Result<TimestampConverter, StitchError> {
        TimestampConverter::new(&self.timezone)
    }

    pub fn thresholds(&self) -> Result<GapThresholds, StitchError> {
        GapThresholds::new(self.warn_gap_ms, self.error_gap_ms)
    }

    /// Filename prefix for a series kind
    pub fn prefix_for(&self, kind: SeriesKind) -> &str {
        match kind {
            SeriesKind::GreenPpg => &self.green_ppg_prefix,
            SeriesKind::HeartRate => &self.heart_rate_prefix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = StitchConfig::from_toml_str("").unwrap();
        assert_eq!(config, StitchConfig::default());
        assert_eq!(config.timezone, "US/Pacific");
        assert_eq!(config.thresholds().unwrap(), GapThresholds::new(40, 80).unwrap());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = StitchConfig::from_toml_str(
            r#"
            timezone = "Europe/Berlin"
            warn_gap_ms = 100
            error_gap_ms = 1000
            ibi_policy = "average"
            "#,
        )
        .unwrap();

        assert_eq!(config.timezone, "Europe/Berlin");
        assert_eq!(config.ibi_policy, IbiPolicy::Average);
        assert_eq!(config.green_ppg_prefix, "green_ppg_data");
        assert_eq!(config.prefix_for(SeriesKind::HeartRate), "heart_rate_data");
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let result = StitchConfig::from_toml_str("warn_gap_ms = 80\nerror_gap_ms = 40");
        assert!(matches!(
            result,
            Err(StitchError::InvalidThresholds {
                warn_gap_ms: 80,
                error_gap_ms: 40
            })
        ));
    }

    #[test]
    fn test_rejects_unknown_timezone() {
        let result = StitchConfig::from_toml_str(r#"timezone = "Nowhere/Special""#);
        assert!(matches!(result, Err(StitchError::InvalidTimezone(_))));
    }

    #[test]
    fn test_equal_thresholds_allowed() {
        assert!(GapThresholds::new(50, 50).is_ok());
    }
}
