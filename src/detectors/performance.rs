// Performance detector: the generic comparator with performance defaults
//
// Caller overrides are merged over the defaults (caller values win).

use crate::detectors::Detector;
use crate::regression::{metric_map_from_value, MetricComparator, MetricMap, RegressionRecord, RegressionType};
use crate::thresholds::{ThresholdManager, PERFORMANCE};
use serde_json::Value;
use std::collections::BTreeMap;

/// Default performance thresholds (percent increase)
pub fn default_performance_thresholds() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("execution_time".to_string(), 50.0),
        ("memory_usage".to_string(), 100.0),
        ("cpu_usage".to_string(), 75.0),
        ("response_time".to_string(), 100.0),
        ("database_queries".to_string(), 100.0),
    ])
}

/// Detects numeric performance regressions
#[derive(Debug, Clone)]
pub struct PerformanceDetector {
    comparator: MetricComparator,
}

impl Default for PerformanceDetector {
    fn default() -> Self {
        Self::with_overrides(&BTreeMap::new())
    }
}

impl PerformanceDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with any subset of metrics overridden
    pub fn with_overrides(overrides: &BTreeMap<String, f64>) -> Self {
        let mut thresholds = default_performance_thresholds();
        thresholds.extend(overrides.iter().map(|(k, v)| (k.clone(), *v)));
        Self {
            comparator: MetricComparator::new(RegressionType::Performance)
                .with_thresholds(thresholds),
        }
    }

    /// Defaults overridden by the `performance` category of `manager`
    pub fn from_thresholds(manager: &ThresholdManager) -> Self {
        Self::with_overrides(&manager.category(PERFORMANCE))
    }

    pub fn threshold_for(&self, metric: &str) -> f64 {
        self.comparator.threshold_for(metric)
    }

    pub fn detect_regressions(&self, baseline: &MetricMap, current: &MetricMap) -> Vec<RegressionRecord> {
        let records = self.comparator.compare(baseline, current);
        tracing::debug!("Detected {} performance regressions", records.len());
        records
    }
}

impl Detector for PerformanceDetector {
    fn name(&self) -> &'static str {
        "performance"
    }

    fn domain(&self) -> &'static str {
        "performance"
    }

    fn detect(&self, baseline: &Value, current: &Value) -> Vec<RegressionRecord> {
        self.detect_regressions(&metric_map_from_value(baseline), &metric_map_from_value(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::Severity;
    use serde_json::json;

    #[test]
    fn test_default_thresholds_applied() {
        let detector = PerformanceDetector::new();
        assert_eq!(detector.threshold_for("memory_usage"), 100.0);
        assert_eq!(detector.threshold_for("cpu_usage"), 75.0);
        assert_eq!(detector.threshold_for("unlisted"), 50.0);
    }

    #[test]
    fn test_memory_below_its_threshold() {
        // 80% increase: over the generic 50% but under memory_usage's 100%
        let records = PerformanceDetector::new().detect(
            &json!({"memory_usage": 100.0}),
            &json!({"memory_usage": 180.0}),
        );
        assert!(records.is_empty());
    }

    #[test]
    fn test_caller_override_wins() {
        let overrides = BTreeMap::from([("memory_usage".to_string(), 20.0)]);
        let detector = PerformanceDetector::with_overrides(&overrides);
        assert_eq!(detector.threshold_for("memory_usage"), 20.0);
        assert_eq!(detector.threshold_for("cpu_usage"), 75.0);

        let records = detector.detect(&json!({"memory_usage": 100}), &json!({"memory_usage": 180}));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity(), Severity::Medium);
    }

    #[test]
    fn test_from_threshold_manager() {
        let mut manager = ThresholdManager::new();
        manager.update_threshold(PERFORMANCE, "cpu_usage", 5.0).unwrap();
        let detector = PerformanceDetector::from_thresholds(&manager);
        assert_eq!(detector.threshold_for("cpu_usage"), 5.0);
        assert_eq!(detector.threshold_for("execution_time"), 50.0);
    }
}
