// Run configuration for a regression check
//
// Loaded from TOML; every section is optional and falls back to the defaults
// below. Thresholds given here are overlaid on the detector defaults, so a
// config only has to name the limits it changes.

use crate::error::{EngineError, Result};
use crate::notification::NotificationConfig;
use crate::thresholds::{validate_thresholds, ThresholdSet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default trailing window for history queries
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// `[history]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Trailing window used by stats and trend queries
    pub window_days: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

/// Configuration for one baseline-vs-current run
///
/// # Example
/// ```
/// use vigia::regression::RegressionConfig;
///
/// let config = RegressionConfig::from_toml_str(r#"
///     current_version = "v2.0.0"
///
///     [thresholds.performance]
///     execution_time = 20.0
/// "#).unwrap();
/// assert_eq!(config.current_version, "v2.0.0");
/// assert_eq!(config.history.window_days, 7);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    pub baseline_version: String,
    pub current_version: String,

    /// Overrides on top of the detector defaults (category → metric → percent)
    pub thresholds: ThresholdSet,

    pub notifications: NotificationConfig,

    pub history: HistoryConfig,

    /// Attach mitigation strategies to every record before reporting
    pub annotate_mitigations: bool,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            baseline_version: "v1.0.0".to_string(),
            current_version: "v1.1.0".to_string(),
            thresholds: ThresholdSet::new(),
            notifications: NotificationConfig::default(),
            history: HistoryConfig::default(),
            annotate_mitigations: false,
        }
    }
}

impl RegressionConfig {
    /// Local-run configuration: notifications off
    pub fn quiet() -> Self {
        Self {
            notifications: NotificationConfig::disabled(),
            ..Self::default()
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML configuration
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate().map_err(EngineError::Config)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        validate_thresholds(&self.thresholds).map_err(|e| e.to_string())?;

        if self.history.window_days == 0 {
            return Err("history.window_days must be at least 1".to_string());
        }

        self.notifications
            .validate()
            .map_err(|e| format!("notifications: {}", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegressionConfig::default();
        assert_eq!(config.baseline_version, "v1.0.0");
        assert_eq!(config.current_version, "v1.1.0");
        assert!(config.thresholds.is_empty());
        assert!(config.notifications.enabled);
        assert_eq!(config.history.window_days, 7);
        assert!(!config.annotate_mitigations);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_quiet_config() {
        let config = RegressionConfig::quiet();
        assert!(!config.notifications.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(RegressionConfig::from_toml_str("").unwrap(), RegressionConfig::default());
    }

    #[test]
    fn test_full_toml() {
        let config = RegressionConfig::from_toml_str(
            r#"
            baseline_version = "v3.0.0"
            annotate_mitigations = true

            [thresholds.test_execution]
            coverage = 2.0

            [notifications]
            enabled = true
            channels = ["slack"]

            [notifications.severity_channels]
            critical = ["slack"]

            [history]
            window_days = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.baseline_version, "v3.0.0");
        assert_eq!(config.current_version, "v1.1.0");
        assert!(config.annotate_mitigations);
        assert_eq!(config.thresholds["test_execution"]["coverage"], 2.0);
        assert_eq!(config.notifications.channels, ["slack"]);
        assert_eq!(config.notifications.severity_channels.len(), 1);
        assert_eq!(config.history.window_days, 30);
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_zero_window_rejected() {
        let mut config = RegressionConfig::default();
        config.history.window_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_threshold_is_config_error() {
        let result = RegressionConfig::from_toml_str("[thresholds.performance]\ncpu_usage = -1.0");
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_unknown_policy_channel_rejected() {
        let result = RegressionConfig::from_toml_str(
            r#"
            [notifications]
            channels = ["email"]

            [notifications.severity_channels]
            high = ["pager"]
            "#,
        );
        assert!(matches!(result, Err(EngineError::Config(msg)) if msg.contains("pager")));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result = RegressionConfig::from_toml_str("history = 3");
        assert!(matches!(result, Err(EngineError::Toml(_))));
    }
}
