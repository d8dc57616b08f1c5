//! Environment contract and record snapshots.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use edge_core::Variables;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::descriptor::QueryDescriptor;
use crate::policy::FetchPolicy;
use crate::query::PreloadedQuery;

/// Exported record cache of an environment. JSON-safe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSnapshot(BTreeMap<String, Value>);

impl RecordSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for a descriptor and variable set.
    pub fn key_for(descriptor: &QueryDescriptor, variables: &Variables) -> String {
        let vars = serde_json::to_string(variables).unwrap_or_default();
        format!("{}:{}", descriptor.id, vars)
    }

    /// Add a response for a descriptor and variable set.
    pub fn with_response(
        mut self,
        descriptor: &QueryDescriptor,
        variables: &Variables,
        data: Value,
    ) -> Self {
        self.insert(Self::key_for(descriptor, variables), data);
        self
    }

    /// Insert a record.
    pub fn insert(&mut self, key: String, data: Value) {
        self.0.insert(key, data);
    }

    /// Look up a record.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Merge another snapshot into this one. Incoming records win.
    pub fn merge(&mut self, other: RecordSnapshot) {
        self.0.extend(other.0);
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no records.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Data-layer environment the orchestrator sequences calls into.
pub trait Environment: Send + Sync {
    /// Start (or satisfy from the store) a fetch for one descriptor.
    fn load_query(
        &self,
        descriptor: &QueryDescriptor,
        variables: &Variables,
        fetch_policy: FetchPolicy,
    ) -> PreloadedQuery;

    /// Export the record cache.
    fn export_records(&self) -> RecordSnapshot;

    /// Import records into the cache.
    fn import_records(&self, records: RecordSnapshot);
}

/// Shared environment handle.
pub type SharedEnvironment = Arc<dyn Environment>;

/// Holds the client environment for the session.
///
/// The factory runs at most once; every later call returns the same environment.
#[derive(Default)]
pub struct EnvironmentCell {
    cell: OnceLock<SharedEnvironment>,
}

impl EnvironmentCell {
    /// Create an empty cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the environment, creating it on first use.
    pub fn get_or_init(&self, factory: impl FnOnce() -> SharedEnvironment) -> SharedEnvironment {
        self.cell
            .get_or_init(|| {
                tracing::debug!("creating client environment");
                factory()
            })
            .clone()
    }

    /// The environment, if already created.
    pub fn get(&self) -> Option<SharedEnvironment> {
        self.cell.get().cloned()
    }
}

impl fmt::Debug for EnvironmentCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentCell")
            .field("initialized", &self.cell.get().is_some())
            .finish()
    }
}
