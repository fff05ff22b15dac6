//! Append-only regression history
//!
//! Every recorded regression becomes a [`HistoryEntry`] in a
//! [`HistoryStore`]. Queries take a trailing window in days and are read-only
//! views over the log. Two stores are provided:
//!
//! - [`InMemoryHistory`]: a mutex-guarded `Vec`, for tests and one-shot runs
//! - [`JsonlHistory`]: one JSON entry per line in an append-only file, so the
//!   log survives between CI runs
//!
//! [`HistoryTracker`] sits on top of a store and computes window statistics
//! and day-bucketed trends.

use crate::error::{EngineError, Result};
use crate::regression::{RegressionRecord, RegressionType, Severity};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Trend ratio above which the recent regression rate counts as increasing
const INCREASING_RATIO: f64 = 1.2;
/// Trend ratio below which it counts as decreasing
const DECREASING_RATIO: f64 = 0.8;
/// Number of most recent day buckets (and entries) the trend looks at
const RECENT_WINDOW: usize = 3;

/// One recorded regression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: RegressionType,
    pub severity: Severity,
    pub details: RegressionRecord,
}

impl HistoryEntry {
    pub fn new(record: &RegressionRecord, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            kind: record.kind(),
            severity: record.severity(),
            details: record.clone(),
        }
    }
}

/// Append-only log of history entries
///
/// Implementations serialize appends; reads see a consistent snapshot.
pub trait HistoryStore: Send + Sync {
    fn append(&self, entry: HistoryEntry) -> Result<()>;

    /// Entries with `timestamp >= since`, oldest first
    fn query(&self, since: DateTime<Utc>) -> Result<Vec<HistoryEntry>>;

    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn sorted_since(entries: impl Iterator<Item = HistoryEntry>, since: DateTime<Utc>) -> Vec<HistoryEntry> {
    let mut selected: Vec<HistoryEntry> = entries.filter(|e| e.timestamp >= since).collect();
    selected.sort_by_key(|e| e.timestamp);
    selected
}

/// History kept in memory
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for InMemoryHistory {
    fn append(&self, entry: HistoryEntry) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| EngineError::LockPoisoned("history log"))?;
        entries.push(entry);
        Ok(())
    }

    fn query(&self, since: DateTime<Utc>) -> Result<Vec<HistoryEntry>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| EngineError::LockPoisoned("history log"))?;
        Ok(sorted_since(entries.iter().cloned(), since))
    }

    fn len(&self) -> Result<usize> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| EngineError::LockPoisoned("history log"))?;
        Ok(entries.len())
    }
}

/// History persisted as JSON lines
///
/// A missing file is an empty history. A line that does not parse makes
/// every read fail with [`EngineError::CorruptHistory`].
#[derive(Debug)]
pub struct JsonlHistory {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<HistoryEntry>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| EngineError::CorruptHistory {
                    line: index + 1,
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

impl HistoryStore for JsonlHistory {
    fn append(&self, entry: HistoryEntry) -> Result<()> {
        let line = serde_json::to_string(&entry)?;
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| EngineError::LockPoisoned("history file"))?;

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    fn query(&self, since: DateTime<Utc>) -> Result<Vec<HistoryEntry>> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| EngineError::LockPoisoned("history file"))?;
        Ok(sorted_since(self.read_all()?.into_iter(), since))
    }

    fn len(&self) -> Result<usize> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| EngineError::LockPoisoned("history file"))?;
        Ok(self.read_all()?.len())
    }
}

/// Window statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total_regressions: usize,
    pub severity_distribution: BTreeMap<Severity, usize>,
    pub type_distribution: BTreeMap<RegressionType, usize>,
    pub period_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityTrend {
    Concerning,
    Acceptable,
}

/// Day-bucketed trend over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub trend_direction: TrendDirection,
    /// Mean regressions per active day over the most recent buckets
    pub regression_rate: f64,
    pub severity_trend: SeverityTrend,
    /// Regressions per calendar day (UTC), days without regressions omitted
    pub daily_counts: BTreeMap<NaiveDate, usize>,
}

fn window_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn mean(values: &[usize]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<usize>() as f64 / values.len() as f64
    }
}

/// Trend of a chronologically sorted entry list
pub fn analyze_trend(entries: &[HistoryEntry]) -> TrendAnalysis {
    let mut daily_counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for entry in entries {
        *daily_counts.entry(entry.timestamp.date_naive()).or_default() += 1;
    }

    let severity_trend = if entries
        .iter()
        .rev()
        .take(RECENT_WINDOW)
        .any(|e| e.severity.requires_action())
    {
        SeverityTrend::Concerning
    } else {
        SeverityTrend::Acceptable
    };

    let counts: Vec<usize> = daily_counts.values().copied().collect();
    if counts.len() < 2 {
        return TrendAnalysis {
            trend_direction: TrendDirection::InsufficientData,
            regression_rate: counts.first().copied().unwrap_or(0) as f64,
            severity_trend,
            daily_counts,
        };
    }

    let split = counts.len().saturating_sub(RECENT_WINDOW);
    let recent = mean(&counts[split..]);
    let older = if split > 0 { mean(&counts[..split]) } else { recent };

    let trend_direction = if recent > older * INCREASING_RATIO {
        TrendDirection::Increasing
    } else if recent < older * DECREASING_RATIO {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    TrendAnalysis {
        trend_direction,
        regression_rate: recent,
        severity_trend,
        daily_counts,
    }
}

/// Records regressions and answers window queries over a [`HistoryStore`]
#[derive(Clone)]
pub struct HistoryTracker {
    store: Arc<dyn HistoryStore>,
}

impl Default for HistoryTracker {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl HistoryTracker {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryHistory::new()))
    }

    /// Tracker over a JSON-lines file
    pub fn jsonl(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(JsonlHistory::new(path)))
    }

    pub fn store(&self) -> &Arc<dyn HistoryStore> {
        &self.store
    }

    /// Record a regression at the time it was detected
    pub fn record(&self, record: &RegressionRecord) -> Result<()> {
        self.record_at(record, record.timestamp())
    }

    pub fn record_at(&self, record: &RegressionRecord, timestamp: DateTime<Utc>) -> Result<()> {
        self.store.append(HistoryEntry::new(record, timestamp))
    }

    /// Record a batch; returns how many entries were appended
    pub fn record_all(&self, records: &[RegressionRecord]) -> Result<usize> {
        for record in records {
            self.record(record)?;
        }
        if !records.is_empty() {
            tracing::info!("Recorded {} regressions in history", records.len());
        }
        Ok(records.len())
    }

    /// Entries from the last `days` days
    pub fn history(&self, days: u32) -> Result<Vec<HistoryEntry>> {
        self.history_at(days, Utc::now())
    }

    pub fn history_at(&self, days: u32, now: DateTime<Utc>) -> Result<Vec<HistoryEntry>> {
        self.store.query(window_start(now, days))
    }

    pub fn stats(&self, days: u32) -> Result<HistoryStats> {
        self.stats_at(days, Utc::now())
    }

    pub fn stats_at(&self, days: u32, now: DateTime<Utc>) -> Result<HistoryStats> {
        let entries = self.history_at(days, now)?;

        let mut severity_distribution = BTreeMap::new();
        let mut type_distribution = BTreeMap::new();
        for entry in &entries {
            *severity_distribution.entry(entry.severity).or_insert(0) += 1;
            *type_distribution.entry(entry.kind).or_insert(0) += 1;
        }

        Ok(HistoryStats {
            total_regressions: entries.len(),
            severity_distribution,
            type_distribution,
            period_days: days,
        })
    }

    pub fn trend(&self, days: u32) -> Result<TrendAnalysis> {
        self.trend_at(days, Utc::now())
    }

    pub fn trend_at(&self, days: u32, now: DateTime<Utc>) -> Result<TrendAnalysis> {
        Ok(analyze_trend(&self.history_at(days, now)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(kind: RegressionType, severity: Severity) -> RegressionRecord {
        RegressionRecord::new(kind, severity, "m", "d")
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_window_filter() {
        let tracker = HistoryTracker::in_memory();
        tracker
            .record_at(&record(RegressionType::Performance, Severity::Low), day(1))
            .unwrap();
        tracker
            .record_at(&record(RegressionType::Performance, Severity::High), day(9))
            .unwrap();

        let now = day(10);
        assert_eq!(tracker.history_at(7, now).unwrap().len(), 1);
        assert_eq!(tracker.history_at(30, now).unwrap().len(), 2);
        assert!(tracker.history_at(0, now).unwrap().is_empty());
        assert_eq!(tracker.history_at(u32::MAX, now).unwrap().len(), 2);
    }

    #[test]
    fn test_stats_distributions() {
        let tracker = HistoryTracker::in_memory();
        let now = day(10);
        for (kind, severity) in [
            (RegressionType::Performance, Severity::High),
            (RegressionType::Performance, Severity::Low),
            (RegressionType::ApiBehavior, Severity::High),
        ] {
            tracker.record_at(&record(kind, severity), day(9)).unwrap();
        }

        let stats = tracker.stats_at(7, now).unwrap();
        assert_eq!(stats.total_regressions, 3);
        assert_eq!(stats.period_days, 7);
        assert_eq!(stats.severity_distribution[&Severity::High], 2);
        assert_eq!(stats.severity_distribution[&Severity::Low], 1);
        assert_eq!(stats.type_distribution[&RegressionType::Performance], 2);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["severity_distribution"]["high"], 2);
        assert_eq!(json["type_distribution"]["api_behavior_regression"], 1);
    }

    #[test]
    fn test_trend_insufficient_data() {
        let tracker = HistoryTracker::in_memory();
        let trend = tracker.trend_at(7, day(10)).unwrap();
        assert_eq!(trend.trend_direction, TrendDirection::InsufficientData);
        assert_eq!(trend.regression_rate, 0.0);
        assert_eq!(trend.severity_trend, SeverityTrend::Acceptable);

        tracker
            .record_at(&record(RegressionType::Performance, Severity::Low), day(9))
            .unwrap();
        let trend = tracker.trend_at(7, day(10)).unwrap();
        assert_eq!(trend.trend_direction, TrendDirection::InsufficientData);
        assert_eq!(trend.regression_rate, 1.0);
    }

    #[test]
    fn test_trend_increasing_and_concerning() {
        let tracker = HistoryTracker::in_memory();
        // One per day on days 1-3, then four per day on days 4-6
        for d in 1..=3 {
            tracker
                .record_at(&record(RegressionType::Performance, Severity::Low), day(d))
                .unwrap();
        }
        for d in 4..=6 {
            for _ in 0..4 {
                tracker
                    .record_at(&record(RegressionType::Performance, Severity::Medium), day(d))
                    .unwrap();
            }
        }
        tracker
            .record_at(&record(RegressionType::DatabaseSchema, Severity::Critical), day(6))
            .unwrap();

        let trend = tracker.trend_at(30, day(7)).unwrap();
        assert_eq!(trend.trend_direction, TrendDirection::Increasing);
        assert_eq!(trend.severity_trend, SeverityTrend::Concerning);
        assert_eq!(trend.daily_counts.len(), 6);
        assert!((trend.regression_rate - 13.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_trend_decreasing_and_stable() {
        fn entries(counts: &[usize]) -> Vec<HistoryEntry> {
            let mut entries = Vec::new();
            for (i, &count) in counts.iter().enumerate() {
                for _ in 0..count {
                    entries.push(HistoryEntry::new(
                        &record(RegressionType::Performance, Severity::Low),
                        day(i as u32 + 1),
                    ));
                }
            }
            entries
        }

        let trend = analyze_trend(&entries(&[10, 10, 1, 1, 1]));
        assert_eq!(trend.trend_direction, TrendDirection::Decreasing);
        assert_eq!(trend.severity_trend, SeverityTrend::Acceptable);

        // Three or fewer buckets compare the recent mean with itself
        let trend = analyze_trend(&entries(&[1, 9]));
        assert_eq!(trend.trend_direction, TrendDirection::Stable);
        assert_eq!(trend.regression_rate, 5.0);
    }

    #[test]
    fn test_jsonl_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");

        let tracker = HistoryTracker::jsonl(&path);
        assert_eq!(tracker.store().len().unwrap(), 0);
        tracker
            .record_all(&[
                record(RegressionType::Performance, Severity::High),
                record(RegressionType::TestExecution, Severity::Medium),
            ])
            .unwrap();

        let reopened = HistoryTracker::jsonl(&path);
        assert_eq!(reopened.store().len().unwrap(), 2);
        let entries = reopened.history(7).unwrap();
        assert_eq!(entries[1].kind, RegressionType::TestExecution);
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_entries_take_detection_time() {
        let tracker = HistoryTracker::in_memory();
        let detected = day(3);
        let stamped = record(RegressionType::Performance, Severity::High).with_timestamp(detected);

        tracker.record(&stamped).unwrap();
        tracker.record_all(&[stamped.clone(), stamped.clone()]).unwrap();

        let entries = tracker.history_at(30, day(10)).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.timestamp == detected));
        assert!(tracker.history_at(5, day(10)).unwrap().is_empty());
    }

    #[test]
    fn test_jsonl_corrupt_line_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        fs::write(&path, "{\"not\": \"an entry\"}\n").unwrap();

        let store = JsonlHistory::new(&path);
        assert!(matches!(
            store.query(DateTime::<Utc>::MIN_UTC),
            Err(EngineError::CorruptHistory { line: 1, .. })
        ));
    }
}
