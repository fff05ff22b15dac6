// Test-execution detector: compare test-run summaries per category
//
// Each field regresses in its own direction:
// - failed:          more failures than before, relative increase over
//                    `test_failure_increase` (0 → n counts as +100%) → High
// - coverage:        lower than before, relative decrease over `coverage`  → Medium
// - execution_time:  slower than before, relative increase over
//                    `execution_time`                                    → Medium
//
// The "overall" summary is compared first, then every other category present
// on both sides in name order.

use crate::detectors::Detector;
use crate::regression::{percentage_change, RegressionRecord, RegressionType, Severity};
use crate::thresholds::{ThresholdManager, TEST_EXECUTION};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Key of the aggregate summary in a test-results snapshot
pub const OVERALL: &str = "overall";

/// Default test-execution thresholds (percent)
pub fn default_test_execution_thresholds() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("execution_time".to_string(), 50.0),
        ("coverage".to_string(), 5.0),
        ("test_failure_increase".to_string(), 10.0),
    ])
}

/// Summary of one test category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestSummary {
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub passed: Option<f64>,
    #[serde(default)]
    pub failed: Option<f64>,
    /// Seconds
    #[serde(default)]
    pub execution_time: Option<f64>,
    /// Percent
    #[serde(default)]
    pub coverage: Option<f64>,
}

impl TestSummary {
    /// Lenient view over a JSON object; non-numeric fields are absent
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let field = |name: &str| object.get(name).and_then(Value::as_f64);
        Some(Self {
            total: field("total"),
            passed: field("passed"),
            failed: field("failed"),
            execution_time: field("execution_time"),
            coverage: field("coverage"),
        })
    }
}

fn summaries_from_value(value: &Value) -> BTreeMap<String, TestSummary> {
    let Some(object) = value.as_object() else {
        return BTreeMap::new();
    };
    object
        .iter()
        .filter_map(|(category, summary)| {
            TestSummary::from_value(summary).map(|parsed| (category.clone(), parsed))
        })
        .collect()
}

/// Detects regressions between test runs
#[derive(Debug, Clone)]
pub struct TestExecutionDetector {
    thresholds: BTreeMap<String, f64>,
    baseline: BTreeMap<String, TestSummary>,
}

impl Default for TestExecutionDetector {
    fn default() -> Self {
        Self::with_overrides(&BTreeMap::new())
    }
}

impl TestExecutionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with any subset of thresholds overridden
    pub fn with_overrides(overrides: &BTreeMap<String, f64>) -> Self {
        let mut thresholds = default_test_execution_thresholds();
        thresholds.extend(overrides.iter().map(|(k, v)| (k.clone(), *v)));
        Self {
            thresholds,
            baseline: BTreeMap::new(),
        }
    }

    /// Defaults overridden by the `test_execution` category of `manager`
    pub fn from_thresholds(manager: &ThresholdManager) -> Self {
        Self::with_overrides(&manager.category(TEST_EXECUTION))
    }

    pub fn threshold_for(&self, field: &str) -> f64 {
        self.thresholds.get(field).copied().unwrap_or(0.0)
    }

    pub fn set_baseline(&mut self, results: BTreeMap<String, TestSummary>) {
        tracing::info!("Baseline test results set: {} categories", results.len());
        self.baseline = results;
    }

    pub fn detect_regressions(&self, current: &BTreeMap<String, TestSummary>) -> Vec<RegressionRecord> {
        compare_runs(self, &self.baseline, current)
    }

    /// Compare one category's summaries
    pub fn compare_summaries(
        &self,
        category: &str,
        baseline: &TestSummary,
        current: &TestSummary,
    ) -> Vec<RegressionRecord> {
        let mut records = Vec::new();
        records.extend(self.check_failures(baseline, current));
        records.extend(self.check_coverage(baseline, current));
        records.extend(self.check_execution_time(baseline, current));

        records
            .into_iter()
            .map(|r| r.with_affected_components(vec![category.to_string()]))
            .collect()
    }

    fn check_failures(&self, baseline: &TestSummary, current: &TestSummary) -> Option<RegressionRecord> {
        let (Some(baseline_failed), Some(current_failed)) = (baseline.failed, current.failed) else {
            return None;
        };
        if current_failed <= baseline_failed {
            return None;
        }

        // No division by zero, but failures appearing from none is a full increase
        let increase = if baseline_failed == 0.0 {
            100.0
        } else {
            (current_failed - baseline_failed) / baseline_failed * 100.0
        };
        if increase <= self.threshold_for("test_failure_increase") {
            return None;
        }

        Some(
            RegressionRecord::new(
                RegressionType::TestExecution,
                Severity::High,
                "test_failure_increase",
                format!(
                    "Test failures increased from {} to {}",
                    baseline_failed, current_failed
                ),
            )
            .with_change(baseline_failed, current_failed),
        )
    }

    fn check_coverage(&self, baseline: &TestSummary, current: &TestSummary) -> Option<RegressionRecord> {
        let (Some(baseline_coverage), Some(current_coverage)) = (baseline.coverage, current.coverage)
        else {
            return None;
        };
        if current_coverage >= baseline_coverage {
            return None;
        }
        let decrease = -percentage_change(baseline_coverage, current_coverage)?;
        if decrease <= self.threshold_for("coverage") {
            return None;
        }

        Some(
            RegressionRecord::new(
                RegressionType::TestExecution,
                Severity::Medium,
                "coverage_decrease",
                format!(
                    "Test coverage decreased from {}% to {}% ({:.1}% decrease)",
                    baseline_coverage, current_coverage, decrease
                ),
            )
            .with_change(baseline_coverage, current_coverage),
        )
    }

    fn check_execution_time(&self, baseline: &TestSummary, current: &TestSummary) -> Option<RegressionRecord> {
        let (Some(baseline_time), Some(current_time)) = (baseline.execution_time, current.execution_time)
        else {
            return None;
        };
        if current_time <= baseline_time {
            return None;
        }
        let increase = percentage_change(baseline_time, current_time)?;
        if increase <= self.threshold_for("execution_time") {
            return None;
        }

        Some(
            RegressionRecord::new(
                RegressionType::TestExecution,
                Severity::Medium,
                "execution_time_increase",
                format!(
                    "Test execution time increased from {}s to {}s",
                    baseline_time, current_time
                ),
            )
            .with_change(baseline_time, current_time),
        )
    }
}

fn compare_runs(
    detector: &TestExecutionDetector,
    baseline: &BTreeMap<String, TestSummary>,
    current: &BTreeMap<String, TestSummary>,
) -> Vec<RegressionRecord> {
    let mut records = Vec::new();

    if let (Some(b), Some(c)) = (baseline.get(OVERALL), current.get(OVERALL)) {
        records.extend(detector.compare_summaries(OVERALL, b, c));
    }

    for (category, current_summary) in current.iter().filter(|(name, _)| *name != OVERALL) {
        if let Some(baseline_summary) = baseline.get(category) {
            records.extend(detector.compare_summaries(category, baseline_summary, current_summary));
        }
    }

    records
}

impl Detector for TestExecutionDetector {
    fn name(&self) -> &'static str {
        "test_execution"
    }

    fn domain(&self) -> &'static str {
        "test_results"
    }

    fn detect(&self, baseline: &Value, current: &Value) -> Vec<RegressionRecord> {
        let records = compare_runs(self, &summaries_from_value(baseline), &summaries_from_value(current));
        tracing::debug!("Detected {} test execution regressions", records.len());
        records
    }
}

/// Aggregate view of one test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteAnalysis {
    pub total_tests: f64,
    pub total_passed: f64,
    pub total_failed: f64,
    /// Percent of tests passed (0 when there are no tests)
    pub success_rate: f64,
    pub failure_rate: f64,
    pub total_execution_time: f64,
    pub average_execution_time: f64,
    pub slowest_category: Option<String>,
    pub recommendations: Vec<String>,
}

/// Summarize a test run across categories
///
/// Named categories are aggregated when present; a run carrying only the
/// `overall` summary is analyzed from that.
pub fn analyze_suite(results: &BTreeMap<String, TestSummary>) -> SuiteAnalysis {
    let named: Vec<(&String, &TestSummary)> =
        results.iter().filter(|(name, _)| *name != OVERALL).collect();
    let categories: Vec<(&String, &TestSummary)> = if named.is_empty() {
        results.iter().collect()
    } else {
        named
    };

    let sum = |field: fn(&TestSummary) -> Option<f64>| -> f64 {
        categories.iter().map(|(_, s)| field(s).unwrap_or(0.0)).sum()
    };
    let total_tests = sum(|s| s.total);
    let total_passed = sum(|s| s.passed);
    let total_failed = sum(|s| s.failed);
    let total_execution_time = sum(|s| s.execution_time);

    let rate = |count: f64| {
        if total_tests > 0.0 {
            count / total_tests * 100.0
        } else {
            0.0
        }
    };
    let average_execution_time = if categories.is_empty() {
        0.0
    } else {
        total_execution_time / categories.len() as f64
    };

    let slowest_category = categories
        .iter()
        .max_by(|(_, a), (_, b)| {
            a.execution_time
                .unwrap_or(0.0)
                .total_cmp(&b.execution_time.unwrap_or(0.0))
        })
        .map(|(name, _)| name.to_string());

    let mut recommendations = Vec::new();
    if total_failed > 10.0 {
        recommendations.push("High number of test failures - investigate root causes".to_string());
    }
    if categories
        .iter()
        .any(|(_, s)| s.execution_time.unwrap_or(0.0) > 300.0)
    {
        recommendations.push("Long execution times detected - consider test optimization".to_string());
    }
    if categories
        .iter()
        .any(|(_, s)| s.coverage.is_some_and(|c| c < 70.0))
    {
        recommendations.push("Low test coverage detected - increase test coverage".to_string());
    }

    SuiteAnalysis {
        total_tests,
        total_passed,
        total_failed,
        success_rate: rate(total_passed),
        failure_rate: rate(total_failed),
        total_execution_time,
        average_execution_time,
        slowest_category,
        recommendations,
    }
}
