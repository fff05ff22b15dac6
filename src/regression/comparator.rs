// Generic threshold-gated numeric comparison
//
// Pure function of (baseline, current, thresholds). Only increases beyond the
// per-metric threshold count; metrics present on one side only are ignored,
// and a zero baseline is skipped rather than divided by.

use crate::regression::record::{percentage_change, RegressionRecord};
use crate::regression::severity::{classify_severity, RegressionType};
use serde_json::Value;
use std::collections::BTreeMap;

/// Flat metric name → numeric value mapping
pub type MetricMap = BTreeMap<String, f64>;

/// Threshold applied when a metric has no configured override (percent)
pub const DEFAULT_THRESHOLD_PERCENT: f64 = 50.0;

/// Compares two flat metric maps against per-metric thresholds
#[derive(Debug, Clone)]
pub struct MetricComparator {
    kind: RegressionType,
    thresholds: BTreeMap<String, f64>,
    default_threshold: f64,
}

impl Default for MetricComparator {
    fn default() -> Self {
        Self::new(RegressionType::Performance)
    }
}

impl MetricComparator {
    /// Comparator tagging its records with `kind`, no overrides
    pub fn new(kind: RegressionType) -> Self {
        Self {
            kind,
            thresholds: BTreeMap::new(),
            default_threshold: DEFAULT_THRESHOLD_PERCENT,
        }
    }

    /// Replace the per-metric thresholds
    pub fn with_thresholds(mut self, thresholds: BTreeMap<String, f64>) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Threshold used for `metric` (override or default)
    pub fn threshold_for(&self, metric: &str) -> f64 {
        self.thresholds
            .get(metric)
            .copied()
            .unwrap_or(self.default_threshold)
    }

    pub fn thresholds(&self) -> &BTreeMap<String, f64> {
        &self.thresholds
    }

    /// Compare `current` against `baseline`
    ///
    /// Records follow the iteration order of `current`.
    ///
    /// # Example
    /// ```
    /// use vigia::regression::{MetricComparator, MetricMap, Severity};
    ///
    /// let baseline = MetricMap::from([("execution_time".to_string(), 1.0)]);
    /// let current = MetricMap::from([("execution_time".to_string(), 2.5)]);
    ///
    /// let records = MetricComparator::default().compare(&baseline, &current);
    /// assert_eq!(records.len(), 1);
    /// assert_eq!(records[0].severity(), Severity::High);
    /// assert_eq!(records[0].regression_percentage(), Some(150.0));
    /// ```
    pub fn compare(&self, baseline: &MetricMap, current: &MetricMap) -> Vec<RegressionRecord> {
        let mut records = Vec::new();

        for (metric, &current_value) in current {
            let Some(&baseline_value) = baseline.get(metric) else {
                continue;
            };
            let Some(pct) = percentage_change(baseline_value, current_value) else {
                tracing::debug!("Skipping {}: zero or non-finite baseline", metric);
                continue;
            };

            if pct > self.threshold_for(metric) {
                records.push(
                    RegressionRecord::new(
                        self.kind,
                        classify_severity(pct),
                        metric.clone(),
                        format!("{} increased by {:.1}%", metric, pct),
                    )
                    .with_change(baseline_value, current_value),
                );
            }
        }

        records
    }
}

/// Compare two metric maps with the given overrides (default 50% otherwise)
pub fn detect_regressions(
    baseline: &MetricMap,
    current: &MetricMap,
    thresholds: &BTreeMap<String, f64>,
) -> Vec<RegressionRecord> {
    MetricComparator::default()
        .with_thresholds(thresholds.clone())
        .compare(baseline, current)
}

/// Extract the numeric entries of a JSON object
///
/// Non-numeric entries are dropped; a non-object yields an empty map.
pub fn metric_map_from_value(value: &Value) -> MetricMap {
    let Some(object) = value.as_object() else {
        return MetricMap::new();
    };

    object
        .iter()
        .filter_map(|(name, v)| match v.as_f64() {
            Some(n) => Some((name.clone(), n)),
            None => {
                tracing::debug!("Ignoring non-numeric metric {}", name);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::severity::Severity;

    fn metrics(pairs: &[(&str, f64)]) -> MetricMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_increase_beyond_default_threshold() {
        let records = detect_regressions(
            &metrics(&[("execution_time", 1.0)]),
            &metrics(&[("execution_time", 2.5)]),
            &BTreeMap::new(),
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metric(), "execution_time");
        assert_eq!(records[0].regression_percentage(), Some(150.0));
        assert_eq!(records[0].severity(), Severity::High);
        assert_eq!(records[0].kind(), RegressionType::Performance);
    }

    #[test]
    fn test_at_threshold_is_not_regression() {
        let records = detect_regressions(
            &metrics(&[("m", 100.0)]),
            &metrics(&[("m", 150.0)]),
            &BTreeMap::new(),
        );
        assert!(records.is_empty());
    }

    #[test]
    fn test_decrease_is_not_regression() {
        let records = detect_regressions(
            &metrics(&[("m", 100.0)]),
            &metrics(&[("m", 10.0)]),
            &BTreeMap::new(),
        );
        assert!(records.is_empty());
    }

    #[test]
    fn test_zero_baseline_skipped() {
        let records = detect_regressions(
            &metrics(&[("m", 0.0)]),
            &metrics(&[("m", 1000.0)]),
            &BTreeMap::new(),
        );
        assert!(records.is_empty());
    }

    #[test]
    fn test_one_sided_metrics_ignored() {
        let records = detect_regressions(
            &metrics(&[("only_baseline", 1.0)]),
            &metrics(&[("only_current", 100.0)]),
            &BTreeMap::new(),
        );
        assert!(records.is_empty());
    }

    #[test]
    fn test_override_threshold() {
        let thresholds = BTreeMap::from([("m".to_string(), 10.0)]);
        let records = detect_regressions(
            &metrics(&[("m", 100.0)]),
            &metrics(&[("m", 120.0)]),
            &thresholds,
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity(), Severity::Low);
    }

    #[test]
    fn test_metric_map_from_value_drops_non_numeric() {
        let value = serde_json::json!({"a": 1, "b": "fast", "c": 2.5, "d": null});
        let map = metric_map_from_value(&value);
        assert_eq!(map, metrics(&[("a", 1.0), ("c", 2.5)]));
        assert!(metric_map_from_value(&serde_json::json!([1, 2])).is_empty());
    }
}
