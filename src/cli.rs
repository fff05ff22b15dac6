//! Command-line interface for vigia

use crate::report::ReportKind;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "vigia")]
#[command(version)]
#[command(about = "Detect and report regressions between baseline and current snapshots", long_about = None)]
pub struct Cli {
    /// Baseline snapshot (JSON object keyed by domain)
    #[arg(short = 'b', long = "baseline", value_name = "FILE")]
    pub baseline: Option<PathBuf>,

    /// Current snapshot to check against the baseline
    #[arg(short = 'c', long = "current", value_name = "FILE")]
    pub current: Option<PathBuf>,

    /// Run configuration (TOML): versions, thresholds, notifications, history window
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report view to print
    #[arg(short = 'r', long = "report", value_enum, default_value = "summary")]
    pub report: ReportKind,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Also write the JSON report to this file
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Regression history log (JSON lines); detected regressions are appended
    #[arg(long = "history", value_name = "FILE")]
    pub history: Option<PathBuf>,

    /// Print history statistics and trend instead of running a comparison (requires --history)
    #[arg(long = "history-stats", requires = "history")]
    pub history_stats: bool,

    /// History window in days (defaults to the configured window)
    #[arg(long = "days", value_name = "N")]
    pub days: Option<u32>,

    /// Only print the shallow key diff of the two snapshots
    #[arg(long = "diff-only", conflicts_with = "history_stats")]
    pub diff_only: bool,

    /// Exit 0 even when high or critical regressions are found
    #[arg(long = "no-fail")]
    pub no_fail: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
