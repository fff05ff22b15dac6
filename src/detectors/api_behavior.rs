// API behavior detector: diff HTTP-response-like snapshots per endpoint
//
// Three independent checks, all evaluated:
// 1. response time more than doubled      → Medium
// 2. status code changed                   → High (regardless of magnitude)
// 3. `data` shape: missing keys → Medium, new keys → Low,
//    `data` dropped entirely → High
//
// Baselines are keyed by endpoint ("GET /resource"). An endpoint without a
// baseline cannot be compared and yields nothing.

use crate::detectors::Detector;
use crate::regression::{RegressionRecord, RegressionType, Severity};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Response time must exceed this multiple of the baseline to count
const RESPONSE_TIME_FACTOR: f64 = 2.0;

/// The parts of an HTTP response the detector looks at
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub status_code: Option<i64>,
    /// Seconds
    #[serde(default)]
    pub response_time: Option<f64>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl ApiResponse {
    pub fn new(status_code: i64, response_time: f64, data: Value) -> Self {
        Self {
            status_code: Some(status_code),
            response_time: Some(response_time),
            data: Some(data),
        }
    }

    /// Lenient view over a JSON object; `None` if `value` is not an object
    ///
    /// Fields of the wrong type are treated as absent.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            status_code: object.get("status_code").and_then(Value::as_i64),
            response_time: object.get("response_time").and_then(Value::as_f64),
            data: object.get("data").cloned(),
        })
    }
}

/// Detects behavioral changes in API responses
#[derive(Debug, Clone)]
pub struct ApiBehaviorDetector {
    baselines: BTreeMap<String, ApiResponse>,
    report_new_fields: bool,
}

impl Default for ApiBehaviorDetector {
    fn default() -> Self {
        Self {
            baselines: BTreeMap::new(),
            report_new_fields: true,
        }
    }
}

impl ApiBehaviorDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether additive `data` keys are reported as Low-severity records
    pub fn with_new_fields(mut self, report: bool) -> Self {
        self.report_new_fields = report;
        self
    }

    /// Set (or replace) the baseline response for an endpoint
    pub fn set_baseline(&mut self, endpoint: impl Into<String>, response: ApiResponse) {
        let endpoint = endpoint.into();
        tracing::info!("Baseline response set for {}", endpoint);
        self.baselines.insert(endpoint, response);
    }

    pub fn baseline(&self, endpoint: &str) -> Option<&ApiResponse> {
        self.baselines.get(endpoint)
    }

    /// Compare the current response of one endpoint to its baseline
    pub fn detect_regressions(&self, endpoint: &str, current: &ApiResponse) -> Vec<RegressionRecord> {
        let Some(baseline) = self.baselines.get(endpoint) else {
            tracing::warn!("No baseline response for endpoint {}: no comparison possible", endpoint);
            return Vec::new();
        };

        let mut records = Vec::new();
        records.extend(check_response_time(baseline, current));
        records.extend(check_status_code(baseline, current));
        records.extend(self.check_data_shape(baseline, current));

        let component = vec![endpoint.to_string()];
        records
            .into_iter()
            .map(|r| r.with_affected_components(component.clone()))
            .collect()
    }

    /// Compare every endpoint of `current`, in endpoint order
    pub fn detect_all(&self, current: &BTreeMap<String, ApiResponse>) -> Vec<RegressionRecord> {
        current
            .iter()
            .flat_map(|(endpoint, response)| self.detect_regressions(endpoint, response))
            .collect()
    }

    fn check_data_shape(&self, baseline: &ApiResponse, current: &ApiResponse) -> Vec<RegressionRecord> {
        let mut records = Vec::new();

        match (&baseline.data, &current.data) {
            (Some(baseline_data), Some(current_data)) => {
                let (Some(baseline_fields), Some(current_fields)) =
                    (baseline_data.as_object(), current_data.as_object())
                else {
                    tracing::debug!("Skipping data shape diff: data is not an object");
                    return records;
                };

                let baseline_keys: BTreeSet<&String> = baseline_fields.keys().collect();
                let current_keys: BTreeSet<&String> = current_fields.keys().collect();

                let missing: Vec<String> = baseline_keys
                    .difference(&current_keys)
                    .map(|k| k.to_string())
                    .collect();
                if !missing.is_empty() {
                    records.push(
                        RegressionRecord::new(
                            RegressionType::ApiBehavior,
                            Severity::Medium,
                            "missing_fields",
                            format!("Missing fields: {}", missing.join(", ")),
                        )
                        .with_values(Some(json!(missing)), None),
                    );
                }

                let added: Vec<String> = current_keys
                    .difference(&baseline_keys)
                    .map(|k| k.to_string())
                    .collect();
                if self.report_new_fields && !added.is_empty() {
                    records.push(
                        RegressionRecord::new(
                            RegressionType::ApiBehavior,
                            Severity::Low,
                            "new_fields",
                            format!("New fields: {}", added.join(", ")),
                        )
                        .with_values(None, Some(json!(added))),
                    );
                }
            }
            (Some(_), None) => {
                records.push(
                    RegressionRecord::new(
                        RegressionType::ApiBehavior,
                        Severity::High,
                        "missing_data_field",
                        "Missing data field in response",
                    )
                    .with_values(Some(json!("data")), None),
                );
            }
            _ => {}
        }

        records
    }
}

fn check_response_time(baseline: &ApiResponse, current: &ApiResponse) -> Option<RegressionRecord> {
    let (Some(baseline_time), Some(current_time)) = (baseline.response_time, current.response_time)
    else {
        return None;
    };
    if baseline_time <= 0.0 {
        tracing::debug!("Skipping response time check: baseline is {}", baseline_time);
        return None;
    }
    if current_time <= baseline_time * RESPONSE_TIME_FACTOR {
        return None;
    }

    Some(
        RegressionRecord::new(
            RegressionType::ApiBehavior,
            Severity::Medium,
            "response_time",
            format!(
                "Response time increased from {}s to {}s",
                baseline_time, current_time
            ),
        )
        .with_change(baseline_time, current_time),
    )
}

fn check_status_code(baseline: &ApiResponse, current: &ApiResponse) -> Option<RegressionRecord> {
    if baseline.status_code == current.status_code {
        return None;
    }

    let describe = |code: Option<i64>| code.map_or_else(|| "none".to_string(), |c| c.to_string());
    Some(
        RegressionRecord::new(
            RegressionType::ApiBehavior,
            Severity::High,
            "status_code",
            format!(
                "Status code changed from {} to {}",
                describe(baseline.status_code),
                describe(current.status_code)
            ),
        )
        .with_values(
            baseline.status_code.map(Value::from),
            current.status_code.map(Value::from),
        ),
    )
}

fn responses_from_value(value: &Value) -> BTreeMap<String, ApiResponse> {
    let Some(object) = value.as_object() else {
        return BTreeMap::new();
    };
    object
        .iter()
        .filter_map(|(endpoint, response)| match ApiResponse::from_value(response) {
            Some(parsed) => Some((endpoint.clone(), parsed)),
            None => {
                tracing::warn!("Ignoring malformed response snapshot for {}", endpoint);
                None
            }
        })
        .collect()
}

impl Detector for ApiBehaviorDetector {
    fn name(&self) -> &'static str {
        "api_behavior"
    }

    fn domain(&self) -> &'static str {
        "api_responses"
    }

    /// `baseline` and `current` map endpoint → response
    ///
    /// Only the baseline section is used; baselines registered with
    /// [`set_baseline`](ApiBehaviorDetector::set_baseline) do not take part.
    fn detect(&self, baseline: &Value, current: &Value) -> Vec<RegressionRecord> {
        let mut detector = ApiBehaviorDetector::new().with_new_fields(self.report_new_fields);
        for (endpoint, response) in responses_from_value(baseline) {
            detector.baselines.insert(endpoint, response);
        }
        let records = detector.detect_all(&responses_from_value(current));
        tracing::debug!("Detected {} API behavior regressions", records.len());
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector_with(endpoint: &str, baseline: ApiResponse) -> ApiBehaviorDetector {
        let mut detector = ApiBehaviorDetector::new();
        detector.set_baseline(endpoint, baseline);
        detector
    }

    #[test]
    fn test_missing_field_is_medium() {
        let detector = detector_with("GET /r", ApiResponse::new(200, 0.1, json!({"a": 1, "b": 2})));
        let records = detector.detect_regressions("GET /r", &ApiResponse::new(200, 0.1, json!({"a": 1})));

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metric(), "missing_fields");
        assert_eq!(records[0].severity(), Severity::Medium);
        assert_eq!(records[0].baseline_value(), Some(&json!(["b"])));
        assert_eq!(records[0].affected_components(), ["GET /r".to_string()]);
    }

    #[test]
    fn test_trait_detect_ignores_registered_baselines() {
        let detector = detector_with("GET /registered", ApiResponse::new(200, 0.1, json!({"a": 1})));
        let baseline = json!({"GET /r": {"status_code": 200, "data": {"a": 1}}});
        let current = json!({
            "GET /r": {"status_code": 200, "data": {"a": 1}},
            "GET /registered": {"status_code": 500, "data": {}}
        });

        assert!(detector.detect(&baseline, &current).is_empty());
        assert_eq!(detector.baseline("GET /registered").map(|r| r.status_code), Some(Some(200)));
    }

    #[test]
    fn test_no_baseline_returns_empty() {
        let detector = ApiBehaviorDetector::new();
        let records = detector.detect_regressions("GET /unknown", &ApiResponse::new(500, 9.0, json!({})));
        assert!(records.is_empty());
    }

    #[test]
    fn test_all_checks_fire_independently() {
        let detector = detector_with("GET /r", ApiResponse::new(200, 0.4, json!({"a": 1, "b": 2})));
        let current = ApiResponse::new(500, 1.2, json!({"a": 1, "c": 3}));
        let records = detector.detect_regressions("GET /r", &current);

        let metrics: Vec<&str> = records.iter().map(|r| r.metric()).collect();
        assert_eq!(metrics, ["response_time", "status_code", "missing_fields", "new_fields"]);

        let response_time = &records[0];
        assert_eq!(response_time.severity(), Severity::Medium);
        let pct = response_time.regression_percentage().unwrap();
        assert!((pct - 200.0).abs() < 1e-9);

        assert_eq!(records[1].severity(), Severity::High);
        assert_eq!(records[1].baseline_value(), Some(&json!(200)));
        assert_eq!(records[1].current_value(), Some(&json!(500)));
        assert_eq!(records[3].severity(), Severity::Low);
    }

    #[test]
    fn test_exactly_double_response_time_is_not_regression() {
        let detector = detector_with("GET /r", ApiResponse::new(200, 0.5, json!({})));
        let records = detector.detect_regressions("GET /r", &ApiResponse::new(200, 1.0, json!({})));
        assert!(records.is_empty());
    }

    #[test]
    fn test_dropped_data_field_is_high() {
        let detector = detector_with("GET /r", ApiResponse::new(200, 0.1, json!({"a": 1})));
        let current = ApiResponse {
            status_code: Some(200),
            response_time: Some(0.1),
            data: None,
        };
        let records = detector.detect_regressions("GET /r", &current);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metric(), "missing_data_field");
        assert_eq!(records[0].severity(), Severity::High);
    }

    #[test]
    fn test_new_fields_can_be_silenced() {
        let mut detector = ApiBehaviorDetector::new().with_new_fields(false);
        detector.set_baseline("GET /r", ApiResponse::new(200, 0.1, json!({"a": 1})));
        let records = detector.detect_regressions("GET /r", &ApiResponse::new(200, 0.1, json!({"a": 1, "z": 0})));
        assert!(records.is_empty());
    }

    #[test]
    fn test_zero_baseline_response_time_skipped() {
        let detector = detector_with("GET /r", ApiResponse::new(200, 0.0, json!({})));
        let records = detector.detect_regressions("GET /r", &ApiResponse::new(200, 5.0, json!({})));
        assert!(records.is_empty());
    }

    #[test]
    fn test_detect_over_json_snapshot() {
        let baseline = json!({
            "GET /a": {"status_code": 200, "response_time": 0.2, "data": {"x": 1}},
            "GET /b": {"status_code": 200}
        });
        let current = json!({
            "GET /a": {"status_code": 200, "response_time": 0.2, "data": {"x": 1}},
            "GET /b": {"status_code": 404},
            "GET /c": {"status_code": 500},
            "GET /d": "not an object"
        });
        let records = ApiBehaviorDetector::new().detect(&baseline, &current);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metric(), "status_code");
        assert_eq!(records[0].affected_components(), ["GET /b".to_string()]);
    }
}
