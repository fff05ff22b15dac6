// Database schema detector: structural diff of table/column definitions
//
// Columns arrive either as a list of names or as a name → metadata map.
// Both are normalized to a set of names when the snapshot is read, so the
// diff itself only ever sees sets.
//
// Only removals are regressions: a dropped table is Critical, a dropped
// column is High. Additive changes are not reported.

use crate::detectors::Detector;
use crate::regression::{RegressionRecord, RegressionType, Severity};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Column names of one raw table entry
///
/// Accepts `{columns: [..]}`, `{columns: {name: meta}}` and a bare list of
/// names. Non-string list entries are dropped; anything else is an empty
/// table.
fn column_names(table: &str, raw: &Value) -> BTreeSet<String> {
    let columns = match raw {
        Value::Array(_) => raw,
        Value::Object(object) => match object.get("columns") {
            Some(columns) => columns,
            None => return BTreeSet::new(),
        },
        other => {
            tracing::warn!("Table {} has no usable definition ({}), treating as empty", table, other);
            return BTreeSet::new();
        }
    };

    match columns {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item.as_str() {
                Some(name) => Some(name.to_string()),
                None => {
                    tracing::warn!("Ignoring non-string column {} in table {}", item, table);
                    None
                }
            })
            .collect(),
        Value::Object(columns) => columns.keys().cloned().collect(),
        other => {
            tracing::warn!("Table {} has unusable columns ({}), treating as empty", table, other);
            BTreeSet::new()
        }
    }
}

/// One table, reduced to its column names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: BTreeSet<String>,
}

impl TableSchema {
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Canonical schema snapshot: table name → column names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub tables: BTreeMap<String, TableSchema>,
}

impl SchemaSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, table: TableSchema) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    /// Normalize a raw `{tables: {name: ..}}` snapshot
    ///
    /// Each table is read on its own, so a malformed table never hides the
    /// others. Returns `None` only when `tables` is present and not an object,
    /// or the value itself is not an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let Some(object) = value.as_object() else {
            tracing::warn!("Ignoring malformed schema snapshot: not an object");
            return None;
        };
        let tables = match object.get("tables") {
            None => return Some(Self::new()),
            Some(Value::Object(tables)) => tables,
            Some(other) => {
                tracing::warn!("Ignoring malformed schema snapshot: tables is {}", other);
                return None;
            }
        };

        let tables = tables
            .iter()
            .map(|(name, raw)| {
                let columns = column_names(name, raw);
                (name.clone(), TableSchema { columns })
            })
            .collect();
        Some(Self { tables })
    }
}

/// Detects dropped tables and columns
#[derive(Debug, Clone, Default)]
pub struct SchemaDetector {
    baseline: SchemaSnapshot,
}

impl SchemaDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_baseline(&mut self, schema: SchemaSnapshot) {
        tracing::info!("Baseline database schema set ({} tables)", schema.tables.len());
        self.baseline = schema;
    }

    pub fn detect_regressions(&self, current: &SchemaSnapshot) -> Vec<RegressionRecord> {
        diff_schemas(&self.baseline, current)
    }
}

/// Diff two schemas; tables are visited in sorted order
pub fn diff_schemas(baseline: &SchemaSnapshot, current: &SchemaSnapshot) -> Vec<RegressionRecord> {
    let mut records = Vec::new();

    let missing_tables: Vec<&String> = baseline
        .tables
        .keys()
        .filter(|name| !current.tables.contains_key(*name))
        .collect();
    if !missing_tables.is_empty() {
        let names: Vec<String> = missing_tables.iter().map(|n| n.to_string()).collect();
        records.push(
            RegressionRecord::new(
                RegressionType::DatabaseSchema,
                Severity::Critical,
                "missing_tables",
                format!("Missing tables: {}", names.join(", ")),
            )
            .with_values(Some(json!(names)), None)
            .with_affected_components(names),
        );
    }

    for (name, baseline_table) in &baseline.tables {
        let Some(current_table) = current.tables.get(name) else {
            continue;
        };

        let missing_columns: Vec<String> = baseline_table
            .columns
            .difference(&current_table.columns)
            .cloned()
            .collect();
        if missing_columns.is_empty() {
            continue;
        }

        records.push(
            RegressionRecord::new(
                RegressionType::DatabaseSchema,
                Severity::High,
                "missing_column",
                format!("Missing columns in {}: {}", name, missing_columns.join(", ")),
            )
            .with_values(Some(json!(missing_columns)), None)
            .with_affected_components(vec![name.clone()]),
        );
    }

    records
}

impl Detector for SchemaDetector {
    fn name(&self) -> &'static str {
        "database_schema"
    }

    fn domain(&self) -> &'static str {
        "database_schema"
    }

    fn detect(&self, baseline: &Value, current: &Value) -> Vec<RegressionRecord> {
        let (Some(baseline), Some(current)) =
            (SchemaSnapshot::from_value(baseline), SchemaSnapshot::from_value(current))
        else {
            return Vec::new();
        };
        let records = diff_schemas(&baseline, &current);
        tracing::debug!("Detected {} database schema regressions", records.len());
        records
    }
}
