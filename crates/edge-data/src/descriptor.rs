//! Query descriptors and ordered descriptor sets.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque handle for a parameterized data-fetch operation.
///
/// The shape is owned by the data layer; the orchestrator only passes it
/// through and serializes it for hydration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryDescriptor {
    /// Stable operation identifier (persisted query id or hash).
    pub id: String,
    /// Operation name, for logs.
    pub name: String,
}

impl QueryDescriptor {
    /// Create a descriptor.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for QueryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.id)
    }
}

/// Named descriptor slots of a page, in declaration order.
///
/// Serializes as a `{name: descriptor}` map. Declaration order only survives
/// in memory; a deserialized set is ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySet {
    slots: Vec<(String, QueryDescriptor)>,
}

impl QuerySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A set with a single slot.
    pub fn single(name: impl Into<String>, descriptor: QueryDescriptor) -> Self {
        Self::new().with(name, descriptor)
    }

    /// Add a slot. A repeated name replaces the earlier descriptor in place.
    pub fn with(mut self, name: impl Into<String>, descriptor: QueryDescriptor) -> Self {
        self.insert(name, descriptor);
        self
    }

    /// Add or replace a slot.
    pub fn insert(&mut self, name: impl Into<String>, descriptor: QueryDescriptor) {
        let name = name.into();
        match self.slots.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = descriptor,
            None => self.slots.push((name, descriptor)),
        }
    }

    /// Descriptor for a slot.
    pub fn get(&self, name: &str) -> Option<&QueryDescriptor> {
        self.slots.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    /// Slot names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|(n, _)| n.as_str())
    }

    /// Slots in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryDescriptor)> {
        self.slots.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether there are no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Serialize for QuerySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.slots.iter().map(|(n, d)| (n, d)))
    }
}

impl<'de> Deserialize<'de> for QuerySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, QueryDescriptor>::deserialize(deserializer)?;
        Ok(Self {
            slots: map.into_iter().collect(),
        })
    }
}
