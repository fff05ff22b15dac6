use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vigia::baseline::{diff_snapshots, load_snapshot, BaselineDiff, Snapshot};
use vigia::cli::{Cli, OutputFormat};
use vigia::history::HistoryTracker;
use vigia::regression::RegressionConfig;
use vigia::report::Reporter;
use vigia::runner::RegressionRunner;

/// Initialize tracing subscriber; `--debug` forces TRACE, otherwise RUST_LOG or warn
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Cli) -> Result<RegressionConfig> {
    match &args.config {
        Some(path) => RegressionConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(RegressionConfig::default()),
    }
}

/// Load the baseline and current snapshots named on the command line
fn load_pair(args: &Cli) -> Result<(Snapshot, Snapshot)> {
    let (Some(baseline_path), Some(current_path)) = (&args.baseline, &args.current) else {
        anyhow::bail!("Must specify both --baseline and --current. Usage: vigia --baseline B.json --current C.json");
    };

    let baseline = load_snapshot(baseline_path)
        .with_context(|| format!("Failed to load baseline {}", baseline_path.display()))?;
    let current = load_snapshot(current_path)
        .with_context(|| format!("Failed to load current snapshot {}", current_path.display()))?;
    Ok((baseline, current))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print window statistics and the day-bucketed trend
fn show_history_stats(args: &Cli, config: &RegressionConfig) -> Result<()> {
    let Some(path) = &args.history else {
        anyhow::bail!("--history-stats requires --history FILE");
    };
    let days = args.days.unwrap_or(config.history.window_days);
    let tracker = HistoryTracker::jsonl(path);

    let stats = tracker
        .stats(days)
        .with_context(|| format!("Failed to read history {}", path.display()))?;
    let trend = tracker.trend(days)?;

    match args.format {
        OutputFormat::Json => print_json(&serde_json::json!({"stats": stats, "trend": trend}))?,
        OutputFormat::Text => {
            println!("=== Regression history (last {} days) ===", stats.period_days);
            println!("Total regressions: {}", stats.total_regressions);
            for (severity, count) in &stats.severity_distribution {
                println!("  {}: {}", severity, count);
            }
            for (kind, count) in &stats.type_distribution {
                println!("  {}: {}", kind, count);
            }
            println!(
                "Trend: {:?} ({:.1} regressions/day), severity {:?}",
                trend.trend_direction, trend.regression_rate, trend.severity_trend
            );
        }
    }
    Ok(())
}

/// Print the shallow key diff between the two snapshots
fn show_diff(args: &Cli, config: &RegressionConfig) -> Result<()> {
    let (baseline, current) = load_pair(args)?;

    // Compared directly: the two labels may be equal
    let diff = BaselineDiff {
        version1: config.baseline_version.clone(),
        version2: config.current_version.clone(),
        differences: diff_snapshots(&baseline, &current),
    };

    match args.format {
        OutputFormat::Json => print_json(&diff)?,
        OutputFormat::Text => {
            if diff.is_empty() {
                println!("✅ {} and {} are identical", diff.version1, diff.version2);
            }
            for difference in &diff.differences {
                println!("{}", difference);
            }
        }
    }
    Ok(())
}

/// Run every detector, report, and decide the exit status
fn run_checks(args: &Cli, config: RegressionConfig) -> Result<ExitCode> {
    let (baseline, current) = load_pair(args)?;

    let mut runner = RegressionRunner::new(config)?;
    if let Some(path) = &args.history {
        runner = runner.with_history(HistoryTracker::jsonl(path));
    }
    let outcome = runner.run(&baseline, &current)?;

    let report = Reporter::new().generate(args.report, &outcome.regressions);
    match args.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print!("{}", report.to_report_string()),
    }

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).with_context(|| format!("Failed to write report {}", path.display()))?;
    }

    if outcome.requires_attention() && !args.no_fail {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let args = Cli::parse();

    // Initialize tracing (stderr, so reports on stdout stay parseable)
    init_tracing(args.debug);

    let config = load_config(&args)?;

    if args.history_stats {
        show_history_stats(&args, &config)?;
        return Ok(ExitCode::SUCCESS);
    }

    if args.diff_only {
        show_diff(&args, &config)?;
        return Ok(ExitCode::SUCCESS);
    }

    run_checks(&args, config)
}
