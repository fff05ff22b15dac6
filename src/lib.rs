//! Vigia - regression detection and reporting for release pipelines
//!
//! Vigia compares a *baseline* snapshot of a system (performance numbers, API
//! responses, database schema, test-run summaries) with a *current* snapshot,
//! turns every deviation that crosses a threshold into a
//! [`RegressionRecord`](regression::RegressionRecord), and builds summary,
//! detailed or executive reports from those records.
//!
//! Data flows one way: snapshots → [`detectors`] → records →
//! [`report`] / [`history`] / [`notification`]. The [`runner`] wires the
//! whole pipeline together; every piece can also be used on its own.
//!
//! ```
//! use serde_json::json;
//! use vigia::detectors::{Detector, PerformanceDetector};
//! use vigia::regression::Severity;
//!
//! let records = PerformanceDetector::new().detect(
//!     &json!({"execution_time": 1.0}),
//!     &json!({"execution_time": 2.5}),
//! );
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].severity(), Severity::High);
//! ```

pub mod baseline;
pub mod cli;
pub mod detectors;
pub mod error;
pub mod history;
pub mod impact;
pub mod notification;
pub mod regression;
pub mod report;
pub mod runner;
pub mod thresholds;

pub use error::{EngineError, Result};
