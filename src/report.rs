//! Regression reports
//!
//! Three views, each built on top of the previous one:
//!
//! - **summary**: counts by severity and type, the records, recommendations
//! - **detailed**: summary + `detailed_analysis` (performance impact,
//!   affected components, trend heuristic)
//! - **executive**: summary + `executive_summary` (business impact, risk
//!   level, whether action is required)
//!
//! The richer views flatten the summary into their own JSON object, so every
//! key of the summary appears unchanged in the detailed and executive
//! reports. Pin the [`Reporter`] to a timestamp to make that exact.

use crate::history::{SeverityTrend, TrendDirection};
use crate::regression::{RegressionRecord, RegressionType, Severity};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which report view to build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Counts, records and recommendations
    #[default]
    Summary,
    /// Summary plus impact and component analysis
    Detailed,
    /// Summary plus business impact and risk level
    Executive,
}

impl ReportKind {
    /// Parse a view name; anything unknown is a summary
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "detailed" => ReportKind::Detailed,
            "executive" => ReportKind::Executive,
            _ => ReportKind::Summary,
        }
    }
}

/// Severity and type counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCounts {
    pub total_regressions: usize,
    pub critical_severity: usize,
    pub high_severity: usize,
    pub medium_severity: usize,
    pub low_severity: usize,
    pub regression_types: BTreeMap<RegressionType, usize>,
}

impl SummaryCounts {
    pub fn from_records(records: &[RegressionRecord]) -> Self {
        let mut counts = Self {
            total_regressions: records.len(),
            ..Self::default()
        };
        for record in records {
            match record.severity() {
                Severity::Critical => counts.critical_severity += 1,
                Severity::High => counts.high_severity += 1,
                Severity::Medium => counts.medium_severity += 1,
                Severity::Low => counts.low_severity += 1,
            }
            *counts.regression_types.entry(record.kind()).or_insert(0) += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub summary: SummaryCounts,
    pub regressions: Vec<RegressionRecord>,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    None,
    Minor,
    Moderate,
    Severe,
}

impl ImpactLevel {
    fn from_average(average: f64) -> Self {
        if average > 100.0 {
            ImpactLevel::Severe
        } else if average > 50.0 {
            ImpactLevel::Moderate
        } else {
            ImpactLevel::Minor
        }
    }
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImpactLevel::None => "none",
            ImpactLevel::Minor => "minor",
            ImpactLevel::Moderate => "moderate",
            ImpactLevel::Severe => "severe",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceImpact {
    pub impact: ImpactLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_regression: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_regressions: Option<usize>,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentImpact {
    pub count: usize,
    /// Severity of each record touching the component, in record order
    pub severities: Vec<Severity>,
}

/// Coarse trend of a single run (history trends live in `history`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunTrend {
    pub trend_direction: TrendDirection,
    pub regression_rate: usize,
    pub severity_trend: SeverityTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedAnalysis {
    pub performance_impact: PerformanceImpact,
    pub affected_components: BTreeMap<String, ComponentImpact>,
    pub trend_analysis: RunTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedReport {
    #[serde(flatten)]
    pub base: SummaryReport,
    pub detailed_analysis: DetailedAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub business_impact: String,
    pub risk_level: RiskLevel,
    pub action_required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveReport {
    #[serde(flatten)]
    pub base: SummaryReport,
    pub executive_summary: ExecutiveSummary,
}

/// Any of the three views
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Report {
    Summary(SummaryReport),
    Detailed(DetailedReport),
    Executive(ExecutiveReport),
}

/// Remediation advice for a set of records, in rule order
pub fn recommendations(records: &[RegressionRecord]) -> Vec<String> {
    let has_severity = |severity: Severity| records.iter().any(|r| r.severity() == severity);
    let has_kind = |kind: RegressionType| records.iter().any(|r| r.kind() == kind);

    let mut advice = Vec::new();
    if has_severity(Severity::Critical) {
        advice.push("IMMEDIATE ACTION REQUIRED: Critical regressions detected");
        advice.push("Consider rolling back to previous stable version");
    }
    if has_severity(Severity::High) {
        advice.push("High priority regressions require immediate attention");
        advice.push("Schedule emergency review meeting");
    }
    if has_kind(RegressionType::Performance) {
        advice.push("Performance optimization required");
        advice.push("Consider code profiling and bottleneck analysis");
    }
    if has_kind(RegressionType::ApiBehavior) {
        advice.push("API compatibility review required");
        advice.push("Update API documentation and client integrations");
    }
    advice.into_iter().map(String::from).collect()
}

/// Average percentage over performance records, bucketed
///
/// Records without a percentage count as 0%.
pub fn performance_impact(records: &[RegressionRecord]) -> PerformanceImpact {
    let percentages: Vec<f64> = records
        .iter()
        .filter(|r| r.kind() == RegressionType::Performance)
        .map(|r| r.regression_percentage().unwrap_or(0.0))
        .collect();

    if percentages.is_empty() {
        return PerformanceImpact {
            impact: ImpactLevel::None,
            average_regression: None,
            total_regressions: None,
            description: "No performance regressions detected".to_string(),
        };
    }

    let average = percentages.iter().sum::<f64>() / percentages.len() as f64;
    PerformanceImpact {
        impact: ImpactLevel::from_average(average),
        average_regression: Some(average),
        total_regressions: Some(percentages.len()),
        description: format!("Average performance regression of {:.1}%", average),
    }
}

/// Occurrence count and severities per affected component
pub fn affected_components(records: &[RegressionRecord]) -> BTreeMap<String, ComponentImpact> {
    let mut components: BTreeMap<String, ComponentImpact> = BTreeMap::new();
    for record in records {
        for component in record.affected_components() {
            let entry = components.entry(component.clone()).or_default();
            entry.count += 1;
            entry.severities.push(record.severity());
        }
    }
    components
}

/// "increasing" above five records, "concerning" with any critical
pub fn run_trend(records: &[RegressionRecord]) -> RunTrend {
    RunTrend {
        trend_direction: if records.len() > 5 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Stable
        },
        regression_rate: records.len(),
        severity_trend: if records.iter().any(|r| r.severity() == Severity::Critical) {
            SeverityTrend::Concerning
        } else {
            SeverityTrend::Acceptable
        },
    }
}

pub fn business_impact(records: &[RegressionRecord]) -> &'static str {
    let critical = records.iter().filter(|r| r.severity() == Severity::Critical).count();
    let high = records.iter().filter(|r| r.severity() == Severity::High).count();

    if critical > 0 {
        "HIGH - Critical regressions may affect production systems"
    } else if high > 2 {
        "MEDIUM - Multiple high-severity regressions require attention"
    } else if high > 0 {
        "LOW - Limited high-severity regressions"
    } else {
        "MINIMAL - No high-severity regressions detected"
    }
}

/// Weighted score (critical 4, high 3, medium 2, low 1) bucketed at 12 and 6
pub fn risk_level(records: &[RegressionRecord]) -> RiskLevel {
    let score: u32 = records.iter().map(|r| r.severity().risk_score()).sum();
    if score >= 12 {
        RiskLevel::High
    } else if score >= 6 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Builds report views from regression records
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    pinned_at: Option<DateTime<Utc>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reporter that stamps every report with `timestamp`
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            pinned_at: Some(timestamp),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.pinned_at.unwrap_or_else(Utc::now)
    }

    pub fn summary(&self, records: &[RegressionRecord]) -> SummaryReport {
        SummaryReport {
            summary: SummaryCounts::from_records(records),
            regressions: records.to_vec(),
            recommendations: recommendations(records),
            timestamp: self.now(),
        }
    }

    pub fn detailed(&self, records: &[RegressionRecord]) -> DetailedReport {
        DetailedReport {
            base: self.summary(records),
            detailed_analysis: DetailedAnalysis {
                performance_impact: performance_impact(records),
                affected_components: affected_components(records),
                trend_analysis: run_trend(records),
            },
        }
    }

    pub fn executive(&self, records: &[RegressionRecord]) -> ExecutiveReport {
        ExecutiveReport {
            base: self.summary(records),
            executive_summary: ExecutiveSummary {
                business_impact: business_impact(records).to_string(),
                risk_level: risk_level(records),
                action_required: records.iter().any(|r| r.severity().requires_action()),
            },
        }
    }

    pub fn generate(&self, kind: ReportKind, records: &[RegressionRecord]) -> Report {
        tracing::debug!("Generating {:?} report for {} regressions", kind, records.len());
        match kind {
            ReportKind::Summary => Report::Summary(self.summary(records)),
            ReportKind::Detailed => Report::Detailed(self.detailed(records)),
            ReportKind::Executive => Report::Executive(self.executive(records)),
        }
    }
}

impl Report {
    pub fn kind(&self) -> ReportKind {
        match self {
            Report::Summary(_) => ReportKind::Summary,
            Report::Detailed(_) => ReportKind::Detailed,
            Report::Executive(_) => ReportKind::Executive,
        }
    }

    /// The summary layer every view carries
    pub fn base(&self) -> &SummaryReport {
        match self {
            Report::Summary(base) => base,
            Report::Detailed(report) => &report.base,
            Report::Executive(report) => &report.base,
        }
    }

    /// Human-readable rendering
    pub fn to_report_string(&self) -> String {
        let base = self.base();
        let counts = &base.summary;
        let mut report = String::new();

        if counts.total_regressions == 0 {
            report.push_str("✅ NO REGRESSIONS DETECTED\n");
        } else {
            let marker = if counts.critical_severity + counts.high_severity > 0 {
                "❌"
            } else {
                "⚠️ "
            };
            report.push_str(&format!(
                "{} {} REGRESSIONS DETECTED ({} critical, {} high, {} medium, {} low)\n",
                marker,
                counts.total_regressions,
                counts.critical_severity,
                counts.high_severity,
                counts.medium_severity,
                counts.low_severity
            ));
        }

        if !counts.regression_types.is_empty() {
            report.push_str("\n📊 By type:\n");
            for (kind, count) in &counts.regression_types {
                report.push_str(&format!("  - {}: {}\n", kind, count));
            }
        }

        if !base.regressions.is_empty() {
            report.push_str("\n📋 Regressions:\n");
            for record in &base.regressions {
                report.push_str(&format!(
                    "  [{}] {}: {}\n",
                    record.severity().as_str().to_uppercase(),
                    record.metric(),
                    record.description()
                ));
            }
        }

        if !base.recommendations.is_empty() {
            report.push_str("\n💡 Recommendations:\n");
            for advice in &base.recommendations {
                report.push_str(&format!("  - {}\n", advice));
            }
        }

        match self {
            Report::Summary(_) => {}
            Report::Detailed(detailed) => {
                let analysis = &detailed.detailed_analysis;
                report.push_str("\n🔍 Detailed analysis:\n");
                report.push_str(&format!(
                    "  Performance impact: {} ({})\n",
                    analysis.performance_impact.impact, analysis.performance_impact.description
                ));
                for (component, impact) in &analysis.affected_components {
                    let severities: Vec<&str> = impact.severities.iter().map(Severity::as_str).collect();
                    report.push_str(&format!(
                        "  Component {}: {} ({})\n",
                        component,
                        impact.count,
                        severities.join(", ")
                    ));
                }
                report.push_str(&format!(
                    "  Trend: {:?}, severity {:?}\n",
                    analysis.trend_analysis.trend_direction, analysis.trend_analysis.severity_trend
                ));
            }
            Report::Executive(executive) => {
                let summary = &executive.executive_summary;
                report.push_str("\n📈 Executive summary:\n");
                report.push_str(&format!("  Business impact: {}\n", summary.business_impact));
                report.push_str(&format!("  Risk level: {}\n", summary.risk_level));
                report.push_str(&format!(
                    "  Action required: {}\n",
                    if summary.action_required { "yes" } else { "no" }
                ));
            }
        }

        report.push_str(&format!("\nGenerated: {}\n", base.timestamp.to_rfc3339()));
        report
    }
}
