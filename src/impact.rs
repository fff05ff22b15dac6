//! Per-regression impact assessment and mitigation strategies

use crate::regression::{RegressionRecord, RegressionType, Severity};
use serde::{Deserialize, Serialize};

/// How bad one regression is for the people running the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactAssessment {
    /// Upper-case severity ("CRITICAL", "HIGH", ...)
    pub severity_level: String,
    pub affected_users: String,
    pub business_impact: String,
    pub recommended_actions: Vec<String>,
    pub estimated_resolution_time: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn assess_impact(record: &RegressionRecord) -> ImpactAssessment {
    let severity = record.severity();

    let (affected_users, business_impact, resolution) = match severity {
        Severity::Critical => ("All users", "HIGH - May cause service outages", "1-4 hours"),
        Severity::High => ("Most users", "MEDIUM - May affect user experience", "4-24 hours"),
        Severity::Medium => ("Some users", "LOW - Minor impact on operations", "1-3 days"),
        Severity::Low => ("Limited users", "MINIMAL - Negligible impact", "1-2 weeks"),
    };

    let recommended_actions = match severity {
        Severity::Critical => strings(&[
            "Immediate rollback to previous stable version",
            "Emergency response team activation",
            "User communication about service disruption",
        ]),
        Severity::High => strings(&[
            "Priority fix development",
            "Monitoring and alerting setup",
            "User notification about potential issues",
        ]),
        Severity::Medium => strings(&[
            "Scheduled fix in next release",
            "Enhanced monitoring",
            "Documentation update",
        ]),
        Severity::Low => strings(&["Fix in regular development cycle", "Monitor for escalation"]),
    };

    ImpactAssessment {
        severity_level: severity.as_str().to_uppercase(),
        affected_users: affected_users.to_string(),
        business_impact: business_impact.to_string(),
        recommended_actions,
        estimated_resolution_time: resolution.to_string(),
    }
}

/// General strategies for high/critical records, then type-specific ones
pub fn mitigation_strategies(record: &RegressionRecord) -> Vec<String> {
    let mut strategies = Vec::new();

    if record.severity().requires_action() {
        strategies.extend(strings(&[
            "Immediate rollback to previous stable version",
            "Hotfix deployment",
            "Emergency response activation",
        ]));
    }

    let specific: &[&str] = match record.kind() {
        RegressionType::Performance => &[
            "Performance optimization",
            "Code profiling and bottleneck analysis",
            "Resource scaling",
            "Caching implementation",
        ],
        RegressionType::ApiBehavior => &[
            "API compatibility fixes",
            "Client integration updates",
            "Documentation updates",
            "Version deprecation strategy",
        ],
        RegressionType::DatabaseSchema => &[
            "Database migration rollback",
            "Schema restoration",
            "Data integrity verification",
            "Backup restoration",
        ],
        RegressionType::TestExecution => &[
            "Test suite optimization",
            "Test data management",
            "Test environment stabilization",
            "Test coverage improvement",
        ],
        RegressionType::Functional => &[],
    };
    strategies.extend(strings(specific));

    strategies
}

/// New records carrying their mitigation strategies as recommendations
pub fn annotate(records: Vec<RegressionRecord>) -> Vec<RegressionRecord> {
    records
        .into_iter()
        .map(|record| {
            let strategies = mitigation_strategies(&record);
            record.with_recommendations(strategies)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: RegressionType, severity: Severity) -> RegressionRecord {
        RegressionRecord::new(kind, severity, "m", "d")
    }

    #[test]
    fn test_assess_critical() {
        let impact = assess_impact(&record(RegressionType::DatabaseSchema, Severity::Critical));
        assert_eq!(impact.severity_level, "CRITICAL");
        assert_eq!(impact.affected_users, "All users");
        assert_eq!(impact.estimated_resolution_time, "1-4 hours");
        assert_eq!(impact.recommended_actions.len(), 3);
    }

    #[test]
    fn test_assess_low() {
        let impact = assess_impact(&record(RegressionType::Performance, Severity::Low));
        assert_eq!(impact.severity_level, "LOW");
        assert_eq!(impact.business_impact, "MINIMAL - Negligible impact");
        assert_eq!(impact.recommended_actions.len(), 2);
    }

    #[test]
    fn test_mitigation_general_plus_specific() {
        let strategies = mitigation_strategies(&record(RegressionType::ApiBehavior, Severity::High));
        assert_eq!(strategies.len(), 7);
        assert_eq!(strategies[0], "Immediate rollback to previous stable version");
        assert_eq!(strategies[3], "API compatibility fixes");

        let strategies = mitigation_strategies(&record(RegressionType::TestExecution, Severity::Medium));
        assert_eq!(strategies.len(), 4);

        assert!(mitigation_strategies(&record(RegressionType::Functional, Severity::Low)).is_empty());
    }

    #[test]
    fn test_annotate_keeps_findings() {
        let original = vec![
            record(RegressionType::Performance, Severity::Medium),
            record(RegressionType::DatabaseSchema, Severity::Critical),
        ];
        let annotated = annotate(original.clone());

        assert_eq!(annotated.len(), 2);
        for (before, after) in original.iter().zip(&annotated) {
            assert_eq!(before.finding_key(), after.finding_key());
            assert!(before.recommendations().is_empty());
            assert_eq!(after.recommendations(), mitigation_strategies(before).as_slice());
        }
    }
}
