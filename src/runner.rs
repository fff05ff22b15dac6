//! Full baseline-vs-current run
//!
//! The runner owns one detector per snapshot domain and drives them over a
//! pair of snapshots. Detectors share no mutable state, so each one runs on
//! its own scoped thread; results are concatenated in detector order
//! (performance, api_behavior, database_schema, test_execution), which keeps
//! the output identical from run to run.
//!
//! After detection the runner optionally attaches mitigation strategies,
//! appends every record to the history log and dispatches notifications.

use crate::baseline::Snapshot;
use crate::detectors::{
    ApiBehaviorDetector, Detector, PerformanceDetector, SchemaDetector, TestExecutionDetector,
};
use crate::error::EngineError;
use crate::history::HistoryTracker;
use crate::impact::annotate;
use crate::notification::{DispatchOutcome, NotificationDispatcher, NotificationTransport};
use crate::regression::{RegressionConfig, RegressionRecord, RegressionType, Severity};
use crate::thresholds::ThresholdManager;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate numbers of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_regressions: usize,
    pub severity_distribution: BTreeMap<Severity, usize>,
    pub type_distribution: BTreeMap<RegressionType, usize>,
    pub has_critical_regressions: bool,
    pub has_high_regressions: bool,
}

impl RunSummary {
    pub fn from_records(records: &[RegressionRecord]) -> Self {
        let mut summary = Self {
            total_regressions: records.len(),
            ..Self::default()
        };
        for record in records {
            *summary.severity_distribution.entry(record.severity()).or_insert(0) += 1;
            *summary.type_distribution.entry(record.kind()).or_insert(0) += 1;
        }
        summary.has_critical_regressions = summary.severity_distribution.contains_key(&Severity::Critical);
        summary.has_high_regressions = summary.severity_distribution.contains_key(&Severity::High);
        summary
    }
}

/// Everything a run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub baseline_version: String,
    pub current_version: String,
    pub timestamp: DateTime<Utc>,
    pub regressions: Vec<RegressionRecord>,
    pub summary: RunSummary,
    #[serde(default)]
    pub notifications: DispatchOutcome,
}

impl RunOutcome {
    /// True when any regression is high or critical
    pub fn requires_attention(&self) -> bool {
        self.summary.has_critical_regressions || self.summary.has_high_regressions
    }
}

/// Detectors plus the side effects of a run
pub struct RegressionRunner {
    config: RegressionConfig,
    thresholds: ThresholdManager,
    detectors: Vec<Box<dyn Detector>>,
    history: Option<HistoryTracker>,
    dispatcher: NotificationDispatcher,
}

impl RegressionRunner {
    /// Build a runner from a validated configuration
    ///
    /// Thresholds from the configuration are overlaid on the detector
    /// defaults. Notifications go through the logging transport until
    /// [`with_transport`](Self::with_transport) replaces it.
    pub fn new(config: RegressionConfig) -> std::result::Result<Self, EngineError> {
        config.validate().map_err(EngineError::Config)?;

        let mut thresholds = ThresholdManager::with_defaults();
        thresholds.merge(&config.thresholds)?;

        let detectors: Vec<Box<dyn Detector>> = vec![
            Box::new(PerformanceDetector::from_thresholds(&thresholds)),
            Box::new(ApiBehaviorDetector::new()),
            Box::new(SchemaDetector::new()),
            Box::new(TestExecutionDetector::from_thresholds(&thresholds)),
        ];

        let dispatcher = NotificationDispatcher::logging(config.notifications.clone());
        Ok(Self {
            config,
            thresholds,
            detectors,
            history: None,
            dispatcher,
        })
    }

    /// Append every detected record to `history`
    pub fn with_history(mut self, history: HistoryTracker) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_transport(mut self, transport: Box<dyn NotificationTransport>) -> Self {
        self.dispatcher = NotificationDispatcher::new(self.config.notifications.clone(), transport);
        self
    }

    pub fn config(&self) -> &RegressionConfig {
        &self.config
    }

    pub fn thresholds(&self) -> &ThresholdManager {
        &self.thresholds
    }

    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Run every detector whose domain has a baseline and a current section
    pub fn detect(&self, baseline: &Snapshot, current: &Snapshot) -> Vec<RegressionRecord> {
        let per_detector: Vec<Vec<RegressionRecord>> = crossbeam::scope(|scope| {
            let handles: Vec<_> = self
                .detectors
                .iter()
                .map(|detector| scope.spawn(move |_| run_detector(detector.as_ref(), baseline, current)))
                .collect();

            handles
                .into_iter()
                .zip(&self.detectors)
                .map(|(handle, detector)| {
                    handle.join().unwrap_or_else(|_| {
                        tracing::error!("Detector {} panicked; its results are dropped", detector.name());
                        Vec::new()
                    })
                })
                .collect()
        })
        .unwrap_or_else(|_| {
            tracing::error!("Detector scope panicked");
            Vec::new()
        });

        per_detector.into_iter().flatten().collect()
    }

    /// Detect, then record history and send notifications
    pub fn run(&self, baseline: &Snapshot, current: &Snapshot) -> Result<RunOutcome> {
        tracing::info!(
            "Running regression checks: {} -> {}",
            self.config.baseline_version,
            self.config.current_version
        );

        let mut regressions = self.detect(baseline, current);
        if self.config.annotate_mitigations {
            regressions = annotate(regressions);
        }

        if let Some(history) = &self.history {
            history
                .record_all(&regressions)
                .context("Failed to record regressions in history")?;
        }

        let notifications = self.dispatcher.dispatch(&regressions);
        let summary = RunSummary::from_records(&regressions);
        tracing::info!(
            "Regression run complete: {} regressions (critical: {}, high: {})",
            summary.total_regressions,
            summary.has_critical_regressions,
            summary.has_high_regressions
        );

        Ok(RunOutcome {
            baseline_version: self.config.baseline_version.clone(),
            current_version: self.config.current_version.clone(),
            timestamp: Utc::now(),
            regressions,
            summary,
            notifications,
        })
    }
}

fn run_detector(detector: &dyn Detector, baseline: &Snapshot, current: &Snapshot) -> Vec<RegressionRecord> {
    let domain = detector.domain();
    let (Some(baseline_section), Some(current_section)) = (baseline.get(domain), current.get(domain)) else {
        if baseline.contains_key(domain) || current.contains_key(domain) {
            tracing::warn!("No {} data on one side: no comparison possible", domain);
        } else {
            tracing::debug!("Skipping {}: domain absent from both snapshots", detector.name());
        }
        return Vec::new();
    };

    let records = detector.detect(baseline_section, current_section);
    tracing::debug!("{} detector produced {} records", detector.name(), records.len());
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::snapshot_from_value;
    use crate::notification::NotificationConfig;
    use serde_json::json;

    fn snapshot(value: serde_json::Value) -> Snapshot {
        snapshot_from_value(value).unwrap()
    }

    fn full_pair() -> (Snapshot, Snapshot) {
        let baseline = snapshot(json!({
            "performance": {"execution_time": 1.0},
            "api_responses": {"GET /contracts": {"status_code": 200, "data": {"a": 1, "b": 2}}},
            "database_schema": {"tables": {"t1": {"columns": ["id", "amount"]}}},
            "test_results": {"overall": {"failed": 0, "coverage": 85}}
        }));
        let current = snapshot(json!({
            "performance": {"execution_time": 2.5},
            "api_responses": {"GET /contracts": {"status_code": 200, "data": {"a": 1}}},
            "database_schema": {"tables": {}},
            "test_results": {"overall": {"failed": 3, "coverage": 80}}
        }));
        (baseline, current)
    }

    #[test]
    fn test_detector_order_is_fixed() {
        let runner = RegressionRunner::new(RegressionConfig::quiet()).unwrap();
        assert_eq!(
            runner.detector_names(),
            ["performance", "api_behavior", "database_schema", "test_execution"]
        );

        let (baseline, current) = full_pair();
        let metrics: Vec<String> = runner
            .detect(&baseline, &current)
            .iter()
            .map(|r| r.metric().to_string())
            .collect();
        assert_eq!(
            metrics,
            [
                "execution_time",
                "missing_fields",
                "missing_tables",
                "test_failure_increase",
                "coverage_decrease",
            ]
        );
    }

    #[test]
    fn test_run_summary_and_attention() {
        let runner = RegressionRunner::new(RegressionConfig::quiet()).unwrap();
        let (baseline, current) = full_pair();
        let outcome = runner.run(&baseline, &current).unwrap();

        assert_eq!(outcome.summary.total_regressions, 5);
        assert!(outcome.summary.has_critical_regressions);
        assert!(outcome.summary.has_high_regressions);
        assert_eq!(outcome.summary.severity_distribution[&Severity::High], 2);
        assert!(outcome.requires_attention());
        assert!(outcome.notifications.is_empty());
        assert_eq!(outcome.baseline_version, "v1.0.0");
    }

    #[test]
    fn test_missing_domain_is_skipped() {
        let runner = RegressionRunner::new(RegressionConfig::quiet()).unwrap();
        let baseline = snapshot(json!({"performance": {"cpu_usage": 10.0}}));
        let current = snapshot(json!({
            "performance": {"cpu_usage": 11.0},
            "database_schema": {"tables": {}}
        }));

        let outcome = runner.run(&baseline, &current).unwrap();
        assert!(outcome.regressions.is_empty());
        assert!(!outcome.requires_attention());
    }

    #[test]
    fn test_config_thresholds_reach_detectors() {
        let mut config = RegressionConfig::quiet();
        config.thresholds.insert(
            "performance".to_string(),
            BTreeMap::from([("cpu_usage".to_string(), 5.0)]),
        );
        let runner = RegressionRunner::new(config).unwrap();
        assert_eq!(runner.thresholds().get_threshold("performance", "cpu_usage"), Some(5.0));
        assert_eq!(runner.thresholds().get_threshold("performance", "memory_usage"), Some(100.0));

        let records = runner.detect(
            &snapshot(json!({"performance": {"cpu_usage": 10.0}})),
            &snapshot(json!({"performance": {"cpu_usage": 11.0}})),
        );
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = RegressionConfig::quiet();
        config.history.window_days = 0;
        assert!(matches!(RegressionRunner::new(config), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_run_records_history_and_annotates() {
        let config = RegressionConfig {
            annotate_mitigations: true,
            notifications: NotificationConfig::default(),
            ..RegressionConfig::default()
        };
        let history = HistoryTracker::in_memory();
        let runner = RegressionRunner::new(config).unwrap().with_history(history.clone());

        let (baseline, current) = full_pair();
        let outcome = runner.run(&baseline, &current).unwrap();

        assert_eq!(history.store().len().unwrap(), 5);
        assert!(outcome.regressions.iter().all(|r| !r.recommendations().is_empty()));
        // critical + 2 high go to email; those plus the medium ones to slack
        assert_eq!(outcome.notifications.delivered.len(), 2);
        assert!(outcome.notifications.all_delivered());
    }
}
