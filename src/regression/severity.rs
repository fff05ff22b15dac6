// Severity and regression-type tags
//
// Both are closed enums so the classifier and the reporter's bucketing are
// checked for exhaustiveness. On the wire they keep the lowercase names that
// report consumers already read ("high", "performance_regression").

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse ordinal classification of a regression
///
/// Ordering follows seriousness: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Minor deviation, informational
    Low,
    /// Noticeable deviation, fix in the next release
    Medium,
    /// Contract break or large deviation, needs prompt attention
    High,
    /// System-level problem, consider rolling back
    Critical,
}

impl Severity {
    /// All severities, least serious first
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// True for severities that demand action (high and critical)
    pub fn requires_action(&self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }

    /// Weight used for aggregate risk scoring
    pub fn risk_score(&self) -> u32 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|severity| severity.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown severity '{}'", s))
    }
}

/// Which kind of snapshot a regression was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RegressionType {
    #[serde(rename = "performance_regression")]
    Performance,
    #[serde(rename = "api_behavior_regression")]
    ApiBehavior,
    #[serde(rename = "database_schema_regression")]
    DatabaseSchema,
    #[serde(rename = "test_execution_regression")]
    TestExecution,
    #[serde(rename = "functional_regression")]
    Functional,
}

impl RegressionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegressionType::Performance => "performance_regression",
            RegressionType::ApiBehavior => "api_behavior_regression",
            RegressionType::DatabaseSchema => "database_schema_regression",
            RegressionType::TestExecution => "test_execution_regression",
            RegressionType::Functional => "functional_regression",
        }
    }
}

impl fmt::Display for RegressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a percentage increase into a severity level
///
/// Fixed bands for generic numeric regressions:
/// - `>= 200%` → Critical
/// - `>= 100%` → High
/// - `>= 50%`  → Medium
/// - otherwise → Low
///
/// Detector-specific overrides (e.g. a changed status code is always High)
/// are applied by the detectors, not here.
///
/// # Example
/// ```
/// use vigia::regression::{classify_severity, Severity};
///
/// assert_eq!(classify_severity(150.0), Severity::High);
/// assert_eq!(classify_severity(10.0), Severity::Low);
/// ```
pub fn classify_severity(percentage_change: f64) -> Severity {
    if percentage_change >= 200.0 {
        Severity::Critical
    } else if percentage_change >= 100.0 {
        Severity::High
    } else if percentage_change >= 50.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}
