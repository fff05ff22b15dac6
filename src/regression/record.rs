// RegressionRecord: the unit every detector emits
//
// Records are immutable once built. The `with_*` methods consume the record
// and are only meant for construction; there are no setters.

use crate::regression::severity::{RegressionType, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Signed percentage change from `baseline` to `current`
///
/// Returns `None` when the baseline is zero or either side is not finite.
pub fn percentage_change(baseline: f64, current: f64) -> Option<f64> {
    if baseline == 0.0 || !baseline.is_finite() || !current.is_finite() {
        return None;
    }
    Some((current - baseline) / baseline * 100.0)
}

/// A detected deviation of a current snapshot from its baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionRecord {
    #[serde(rename = "type")]
    kind: RegressionType,
    severity: Severity,
    metric: String,
    #[serde(default)]
    baseline_value: Option<Value>,
    #[serde(default)]
    current_value: Option<Value>,
    #[serde(default)]
    regression_percentage: Option<f64>,
    description: String,
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    affected_components: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recommendations: Option<Vec<String>>,
}

impl RegressionRecord {
    /// Create a record stamped with the current time
    pub fn new(
        kind: RegressionType,
        severity: Severity,
        metric: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            metric: metric.into(),
            baseline_value: None,
            current_value: None,
            regression_percentage: None,
            description: description.into(),
            timestamp: Utc::now(),
            affected_components: None,
            recommendations: None,
        }
    }

    /// Attach numeric baseline/current values and derive the percentage
    ///
    /// `regression_percentage` is only set when the baseline is non-zero.
    pub fn with_change(mut self, baseline: f64, current: f64) -> Self {
        self.baseline_value = Some(Value::from(baseline));
        self.current_value = Some(Value::from(current));
        self.regression_percentage = percentage_change(baseline, current);
        self
    }

    /// Attach arbitrary (non-numeric or structured) values
    ///
    /// No percentage is derived from these.
    pub fn with_values(mut self, baseline: Option<Value>, current: Option<Value>) -> Self {
        self.baseline_value = baseline;
        self.current_value = current;
        self
    }

    pub fn with_affected_components(mut self, components: Vec<String>) -> Self {
        self.affected_components = Some(components);
        self
    }

    pub fn with_recommendations(mut self, recommendations: Vec<String>) -> Self {
        self.recommendations = Some(recommendations);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn kind(&self) -> RegressionType {
        self.kind
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn baseline_value(&self) -> Option<&Value> {
        self.baseline_value.as_ref()
    }

    pub fn current_value(&self) -> Option<&Value> {
        self.current_value.as_ref()
    }

    pub fn regression_percentage(&self) -> Option<f64> {
        self.regression_percentage
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn affected_components(&self) -> &[String] {
        self.affected_components.as_deref().unwrap_or(&[])
    }

    pub fn recommendations(&self) -> &[String] {
        self.recommendations.as_deref().unwrap_or(&[])
    }

    /// Identity of the finding, ignoring when it was observed
    ///
    /// Two runs over the same inputs produce records with equal keys.
    pub fn finding_key(&self) -> (RegressionType, Severity, &str, Option<&Value>, Option<&Value>) {
        (
            self.kind,
            self.severity,
            self.metric.as_str(),
            self.baseline_value.as_ref(),
            self.current_value.as_ref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_change() {
        assert_eq!(percentage_change(1.0, 2.5), Some(150.0));
        assert_eq!(percentage_change(0.0, 5.0), None);
        assert_eq!(percentage_change(10.0, f64::NAN), None);
        let pct = percentage_change(85.0, 80.0).unwrap();
        assert!((pct + 5.882).abs() < 0.01);
    }

    #[test]
    fn test_with_change_derives_percentage() {
        let record = RegressionRecord::new(
            RegressionType::Performance,
            Severity::High,
            "execution_time",
            "execution_time increased by 150.0%",
        )
        .with_change(1.0, 2.5);

        assert_eq!(record.regression_percentage(), Some(150.0));
        assert_eq!(record.baseline_value(), Some(&Value::from(1.0)));
        assert_eq!(record.current_value(), Some(&Value::from(2.5)));
    }

    #[test]
    fn test_zero_baseline_has_no_percentage() {
        let record = RegressionRecord::new(
            RegressionType::TestExecution,
            Severity::High,
            "test_failure_increase",
            "failures appeared",
        )
        .with_change(0.0, 3.0);
        assert!(record.regression_percentage().is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let record = RegressionRecord::new(
            RegressionType::DatabaseSchema,
            Severity::Critical,
            "missing_tables",
            "Missing tables: t1",
        )
        .with_values(Some(serde_json::json!(["t1"])), None);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "database_schema_regression");
        assert_eq!(json["severity"], "critical");
        assert_eq!(json["baseline_value"], serde_json::json!(["t1"]));
        assert!(json["current_value"].is_null());
        assert!(json.get("affected_components").is_none());

        let back: RegressionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_missing_timestamp_defaults_on_deserialize() {
        let json = serde_json::json!({
            "type": "functional_regression",
            "severity": "low",
            "metric": "login",
            "description": "login flow changed"
        });
        let record: RegressionRecord = serde_json::from_value(json).unwrap();
        assert!(record.timestamp() <= Utc::now());
        assert!(record.affected_components().is_empty());
    }
}
