//! Query variables keyed by descriptor slot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::RouteState;

/// Parameter name to value for one query.
pub type Variables = BTreeMap<String, Value>;

/// Variables for every descriptor slot of a page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryVariables(BTreeMap<String, Variables>);

impl QueryVariables {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default derivation: route parameters merged with the query string,
    /// shared by every slot. Query entries win on a name clash.
    pub fn from_route<'a>(route: &RouteState, slots: impl IntoIterator<Item = &'a str>) -> Self {
        let shared: Variables = route
            .params
            .iter()
            .chain(route.query.iter())
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Self(
            slots
                .into_iter()
                .map(|slot| (slot.to_string(), shared.clone()))
                .collect(),
        )
    }

    /// Set the variables for one slot.
    pub fn with_slot(mut self, slot: impl Into<String>, variables: Variables) -> Self {
        self.0.insert(slot.into(), variables);
        self
    }

    /// Variables for a slot. Missing slots have no variables.
    pub fn for_slot(&self, slot: &str) -> Variables {
        self.0.get(slot).cloned().unwrap_or_default()
    }

    /// Iterate slots and their variables.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Variables)> {
        self.0.iter()
    }

    /// Number of slots with variables.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no slot has variables.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the underlying map.
    pub fn into_inner(self) -> BTreeMap<String, Variables> {
        self.0
    }
}

impl From<BTreeMap<String, Variables>> for QueryVariables {
    fn from(map: BTreeMap<String, Variables>) -> Self {
        Self(map)
    }
}

/// Build a `Variables` map from pairs.
pub fn variables<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Variables
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
