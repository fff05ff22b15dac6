// Threshold-gated regression detection
//
// Baseline and current snapshots are compared metric by metric. A deviation
// becomes a regression only when it moves in the "worse" direction by more
// than the configured threshold; its severity then follows fixed percentage
// bands (see `classify_severity`).
//
// Layout:
// - severity:   closed Severity / RegressionType tags and the classifier
// - record:     the immutable RegressionRecord every detector emits
// - comparator: generic numeric comparator shared by the detectors
// - config:     TOML run configuration

mod comparator;
mod config;
mod record;
mod severity;

pub use comparator::{
    detect_regressions, metric_map_from_value, MetricComparator, MetricMap,
    DEFAULT_THRESHOLD_PERCENT,
};
pub use config::{HistoryConfig, RegressionConfig, DEFAULT_WINDOW_DAYS};
pub use record::{percentage_change, RegressionRecord};
pub use severity::{classify_severity, RegressionType, Severity};
