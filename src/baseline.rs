//! Versioned baseline storage
//!
//! A [`Baseline`] is a named snapshot (`{domain: data}`) that never changes
//! once established; recording new measurements means establishing a new
//! version. The [`BaselineManager`] is safe to share between threads: writes
//! take the store's write lock, reads hand out `Arc` snapshots.

use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Snapshot data keyed by domain (`performance`, `api_responses`, ...)
pub type Snapshot = BTreeMap<String, Value>;

/// An established, immutable baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub version: String,
    pub data: Snapshot,
    pub established_at: DateTime<Utc>,
}

/// Result of a shallow baseline-to-baseline comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineDiff {
    pub version1: String,
    pub version2: String,
    pub differences: Vec<String>,
}

impl BaselineDiff {
    pub fn is_empty(&self) -> bool {
        self.differences.is_empty()
    }
}

/// Shallow key-presence-and-equality diff, keys in sorted order
pub fn diff_snapshots(first: &Snapshot, second: &Snapshot) -> Vec<String> {
    let keys: BTreeSet<&String> = first.keys().chain(second.keys()).collect();

    keys.into_iter()
        .filter_map(|key| match (first.get(key), second.get(key)) {
            (None, _) => Some(format!("Key '{}' missing in first dataset", key)),
            (_, None) => Some(format!("Key '{}' missing in second dataset", key)),
            (Some(a), Some(b)) if a != b => Some(format!("Key '{}' has different values", key)),
            _ => None,
        })
        .collect()
}

/// Read a snapshot from a JSON file holding an object
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Snapshot> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    snapshot_from_value(value)
        .ok_or_else(|| EngineError::Snapshot(format!("{} does not contain a JSON object", path.display())))
}

/// View a JSON object as a snapshot; `None` for any other JSON value
pub fn snapshot_from_value(value: Value) -> Option<Snapshot> {
    match value {
        Value::Object(map) => Some(map.into_iter().collect()),
        _ => None,
    }
}

/// Convert a snapshot back into a JSON object
pub fn snapshot_to_value(snapshot: &Snapshot) -> Value {
    Value::Object(snapshot.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<Map<_, _>>())
}

/// Named, versioned baseline store
#[derive(Debug, Default)]
pub struct BaselineManager {
    baselines: RwLock<BTreeMap<String, Arc<Baseline>>>,
}

impl BaselineManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Establish a new baseline version
    ///
    /// Fails with [`EngineError::BaselineExists`] if `version` is taken.
    pub fn establish(&self, version: impl Into<String>, data: Snapshot) -> Result<Arc<Baseline>> {
        let version = version.into();
        let mut baselines = self
            .baselines
            .write()
            .map_err(|_| EngineError::LockPoisoned("baseline store"))?;

        if baselines.contains_key(&version) {
            return Err(EngineError::BaselineExists(version));
        }

        let baseline = Arc::new(Baseline {
            version: version.clone(),
            data,
            established_at: Utc::now(),
        });
        baselines.insert(version.clone(), Arc::clone(&baseline));
        tracing::info!("Baseline established for version {}", version);
        Ok(baseline)
    }

    /// Look up a version; a missing version is `Ok(None)`
    pub fn get(&self, version: &str) -> Result<Option<Arc<Baseline>>> {
        let baselines = self
            .baselines
            .read()
            .map_err(|_| EngineError::LockPoisoned("baseline store"))?;
        Ok(baselines.get(version).cloned())
    }

    /// Established versions in sorted order
    pub fn list(&self) -> Result<Vec<String>> {
        let baselines = self
            .baselines
            .read()
            .map_err(|_| EngineError::LockPoisoned("baseline store"))?;
        Ok(baselines.keys().cloned().collect())
    }

    /// Shallow diff of two established versions
    pub fn compare(&self, version1: &str, version2: &str) -> Result<BaselineDiff> {
        let first = self
            .get(version1)?
            .ok_or_else(|| EngineError::BaselineNotFound(version1.to_string()))?;
        let second = self
            .get(version2)?
            .ok_or_else(|| EngineError::BaselineNotFound(version2.to_string()))?;

        Ok(BaselineDiff {
            version1: version1.to_string(),
            version2: version2.to_string(),
            differences: diff_snapshots(&first.data, &second.data),
        })
    }
}
