//! Specialized regression detectors
//!
//! Each detector owns one snapshot shape:
//!
//! | Detector                 | Snapshot domain    | Shape                                       |
//! |--------------------------|--------------------|---------------------------------------------|
//! | [`PerformanceDetector`]  | `performance`      | `{metric: number}`                          |
//! | [`ApiBehaviorDetector`]  | `api_responses`    | `{endpoint: {status_code, response_time, data}}` |
//! | [`SchemaDetector`]       | `database_schema`  | `{tables: {name: {columns: [..] \| {..}}}}` |
//! | [`TestExecutionDetector`]| `test_results`     | `{category: {total, passed, failed, execution_time, coverage}}` |
//!
//! Every detector has a typed API plus a [`Detector`] impl over raw JSON so
//! the runner can drive them uniformly. Detectors hold no mutable state
//! during detection, so independent detectors may run on separate threads.

mod api_behavior;
mod performance;
mod schema;
mod test_execution;

pub use api_behavior::{ApiBehaviorDetector, ApiResponse};
pub use performance::{default_performance_thresholds, PerformanceDetector};
pub use schema::{diff_schemas, SchemaDetector, SchemaSnapshot, TableSchema};
pub use test_execution::{
    analyze_suite, default_test_execution_thresholds, SuiteAnalysis, TestExecutionDetector,
    TestSummary, OVERALL,
};

use crate::regression::RegressionRecord;
use serde_json::Value;

/// A detector that can compare one snapshot domain given as JSON
pub trait Detector: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Snapshot key this detector reads (e.g. `"performance"`)
    fn domain(&self) -> &'static str;

    /// Compare the domain's baseline and current data
    ///
    /// Never fails: unusable input yields an empty or partial result.
    fn detect(&self, baseline: &Value, current: &Value) -> Vec<RegressionRecord>;
}
