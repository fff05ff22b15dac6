//! Hierarchical threshold configuration (category → metric → value)
//!
//! Detectors read their limits from a [`ThresholdManager`] instead of
//! hard-coded constants. Values are percentages for relative metrics; every
//! value must be finite and non-negative, and a malformed store is rejected
//! as a whole.
//!
//! # Example thresholds.toml
//!
//! ```toml
//! [performance]
//! execution_time = 50.0
//! memory_usage = 100.0
//!
//! [test_execution]
//! coverage = 5.0
//! test_failure_increase = 10.0
//! ```

use crate::detectors::{default_performance_thresholds, default_test_execution_thresholds};
use crate::error::{EngineError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Two-level mapping: category → metric name → threshold
pub type ThresholdSet = BTreeMap<String, BTreeMap<String, f64>>;

/// Category read by the performance detector
pub const PERFORMANCE: &str = "performance";
/// Category read by the test-execution detector
pub const TEST_EXECUTION: &str = "test_execution";

/// Built-in defaults for every detector that reads thresholds
pub fn default_thresholds() -> ThresholdSet {
    BTreeMap::from([
        (PERFORMANCE.to_string(), default_performance_thresholds()),
        (TEST_EXECUTION.to_string(), default_test_execution_thresholds()),
    ])
}

fn validate_value(category: &str, metric: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(EngineError::InvalidThreshold {
            category: category.to_string(),
            metric: metric.to_string(),
            reason: format!("must be finite, got {}", value),
        });
    }
    if value < 0.0 {
        return Err(EngineError::InvalidThreshold {
            category: category.to_string(),
            metric: metric.to_string(),
            reason: format!("must be non-negative, got {}", value),
        });
    }
    Ok(())
}

/// Validate every entry of a threshold set
pub fn validate_thresholds(set: &ThresholdSet) -> Result<()> {
    for (category, metrics) in set {
        for (metric, &value) in metrics {
            validate_value(category, metric, value)?;
        }
    }
    Ok(())
}

/// Nested get/set store for detection thresholds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdManager {
    thresholds: ThresholdSet,
}

impl ThresholdManager {
    /// Empty store (detectors fall back to their own defaults)
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with [`default_thresholds`]
    pub fn with_defaults() -> Self {
        Self {
            thresholds: default_thresholds(),
        }
    }

    /// Load a store from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse a store from TOML (`[category]` tables of `metric = value`)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let thresholds: ThresholdSet = toml::from_str(content)?;
        let mut manager = Self::new();
        manager.set_thresholds(thresholds)?;
        Ok(manager)
    }

    /// Replace the whole store; nothing changes if any value is invalid
    pub fn set_thresholds(&mut self, thresholds: ThresholdSet) -> Result<()> {
        validate_thresholds(&thresholds)?;
        tracing::info!("Thresholds set for {} categories", thresholds.len());
        self.thresholds = thresholds;
        Ok(())
    }

    /// Overlay `overrides` on top of the current store (overrides win)
    pub fn merge(&mut self, overrides: &ThresholdSet) -> Result<()> {
        validate_thresholds(overrides)?;
        for (category, metrics) in overrides {
            let entry = self.thresholds.entry(category.clone()).or_default();
            for (metric, &value) in metrics {
                entry.insert(metric.clone(), value);
            }
        }
        Ok(())
    }

    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    pub fn get_threshold(&self, category: &str, metric: &str) -> Option<f64> {
        self.thresholds
            .get(category)
            .and_then(|metrics| metrics.get(metric))
            .copied()
    }

    /// All thresholds of one category (empty when unknown)
    pub fn category(&self, category: &str) -> BTreeMap<String, f64> {
        self.thresholds.get(category).cloned().unwrap_or_default()
    }

    /// Set a single threshold, creating the category if needed
    pub fn update_threshold(&mut self, category: &str, metric: &str, value: f64) -> Result<()> {
        validate_value(category, metric, value)?;
        self.thresholds
            .entry(category.to_string())
            .or_default()
            .insert(metric.to_string(), value);
        tracing::info!("Threshold updated: {}.{} = {}", category, metric, value);
        Ok(())
    }
}
