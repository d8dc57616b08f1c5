//! In-memory environment with a pluggable network.
//!
//! Keeps the record cache in a map and records recent loads, which makes it
//! the data-layer double for orchestrator tests and a workable environment
//! for hosts that fetch through a single async function. The load history
//! is capped at [`LOAD_HISTORY_LIMIT`] entries; the load counter is not.

use std::fmt;
use std::future::Future;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use edge_core::Variables;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::descriptor::QueryDescriptor;
use crate::environment::{Environment, RecordSnapshot};
use crate::error::FetchError;
use crate::policy::FetchPolicy;
use crate::query::{PreloadedQuery, QuerySource};

/// Network function: descriptor and variables to a response.
pub type NetworkFn = Arc<
    dyn Fn(&QueryDescriptor, &Variables) -> BoxFuture<'static, Result<Value, FetchError>>
        + Send
        + Sync,
>;

/// Build a `NetworkFn` from an async closure.
pub fn network<F, Fut>(f: F) -> NetworkFn
where
    F: Fn(QueryDescriptor, Variables) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, FetchError>> + Send + 'static,
{
    Arc::new(move |descriptor: &QueryDescriptor, variables: &Variables| {
        f(descriptor.clone(), variables.clone()).boxed()
    })
}

/// Most recent loads kept by a `MemoryEnvironment`.
pub const LOAD_HISTORY_LIMIT: usize = 256;

/// One recorded `load_query` call.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadCall {
    /// Descriptor loaded.
    pub descriptor: QueryDescriptor,
    /// Variables loaded with.
    pub variables: Variables,
    /// Policy requested.
    pub fetch_policy: FetchPolicy,
    /// Whether the network was hit.
    pub hit_network: bool,
}

/// Environment backed by an in-memory record map.
pub struct MemoryEnvironment {
    records: Arc<RwLock<RecordSnapshot>>,
    network: NetworkFn,
    loads: Mutex<VecDeque<LoadCall>>,
    load_count: AtomicUsize,
    disposals: Arc<AtomicUsize>,
}

impl MemoryEnvironment {
    /// Create an environment fetching through `network`.
    pub fn new(network: NetworkFn) -> Self {
        Self {
            records: Arc::new(RwLock::new(RecordSnapshot::new())),
            network,
            loads: Mutex::new(VecDeque::new()),
            load_count: AtomicUsize::new(0),
            disposals: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// An environment whose network always fails.
    pub fn offline() -> Self {
        Self::new(network(|_, _| async {
            Err(FetchError::Network("offline".to_string()))
        }))
    }

    /// Seed the record cache.
    pub fn with_records(self, records: RecordSnapshot) -> Self {
        self.import_records(records);
        self
    }

    /// The most recent loads, oldest first.
    pub fn loads(&self) -> Vec<LoadCall> {
        self.loads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Number of loads so far, including those dropped from the history.
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    /// Number of handles disposed so far.
    pub fn dispose_count(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn fetch(&self, descriptor: &QueryDescriptor, variables: &Variables, key: String) -> QuerySource {
        let request = (self.network)(descriptor, variables);
        let records = self.records.clone();
        QuerySource::new(async move {
            let data = request.await?;
            records
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .insert(key, data.clone());
            Ok(Arc::new(data))
        })
    }
}

impl Environment for MemoryEnvironment {
    fn load_query(
        &self,
        descriptor: &QueryDescriptor,
        variables: &Variables,
        fetch_policy: FetchPolicy,
    ) -> PreloadedQuery {
        let key = RecordSnapshot::key_for(descriptor, variables);
        let cached = if fetch_policy.reads_store() {
            self.lookup(&key)
        } else {
            None
        };
        let hit_network = match cached {
            Some(_) => fetch_policy.refreshes_on_hit(),
            None => fetch_policy.fetches_on_miss(),
        };

        let disposals = self.disposals.clone();
        let mut builder = PreloadedQuery::builder(descriptor.clone(), variables.clone(), fetch_policy)
            .on_dispose(move || {
                disposals.fetch_add(1, Ordering::SeqCst);
            });
        if let Some(data) = cached {
            builder = builder.cached(data);
        }
        if hit_network {
            builder = builder.source(self.fetch(descriptor, variables, key));
        }

        tracing::debug!(
            query = %descriptor,
            policy = %fetch_policy,
            network = hit_network,
            "query loaded"
        );
        self.load_count.fetch_add(1, Ordering::SeqCst);
        let mut loads = self.loads.lock().unwrap_or_else(|e| e.into_inner());
        if loads.len() == LOAD_HISTORY_LIMIT {
            loads.pop_front();
        }
        loads.push_back(LoadCall {
            descriptor: descriptor.clone(),
            variables: variables.clone(),
            fetch_policy,
            hit_network,
        });
        drop(loads);

        builder.build()
    }

    fn export_records(&self) -> RecordSnapshot {
        self.records.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn import_records(&self, records: RecordSnapshot) {
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .merge(records);
    }
}

impl fmt::Debug for MemoryEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryEnvironment")
            .field("records", &self.export_records().len())
            .field("loads", &self.load_count())
            .field("disposals", &self.dispose_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use edge_core::variables;
    use futures::executor::block_on;
    use serde_json::json;

    use super::*;
    use crate::query::QueryStatus;

    fn echo_env() -> MemoryEnvironment {
        MemoryEnvironment::new(network(|d, v| async move {
            Ok(json!({ "query": d.id, "vars": v }))
        }))
    }

    fn home() -> QueryDescriptor {
        QueryDescriptor::new("d1", "HomeQuery")
    }

    // === Policy Tests ===

    #[test]
    fn test_store_or_network_miss_hits_network() {
        let env = echo_env();
        let vars = variables([("id", "7")]);

        let query = env.load_query(&home(), &vars, FetchPolicy::StoreOrNetwork);

        assert!(query.source().is_some());
        assert!(env.loads()[0].hit_network);
    }

    #[test]
    fn test_store_or_network_hit_has_no_source() {
        let vars = variables([("id", "7")]);
        let env = echo_env()
            .with_records(RecordSnapshot::new().with_response(&home(), &vars, json!("cached")));

        let query = env.load_query(&home(), &vars, FetchPolicy::StoreOrNetwork);

        assert!(query.source().is_none());
        assert_eq!(query.status(), QueryStatus::Ready(Arc::new(json!("cached"))));
        assert!(!env.loads()[0].hit_network);
    }

    #[test]
    fn test_store_and_network_hit_refreshes() {
        let vars = variables([("id", "7")]);
        let env = echo_env()
            .with_records(RecordSnapshot::new().with_response(&home(), &vars, json!("cached")));

        let query = env.load_query(&home(), &vars, FetchPolicy::StoreAndNetwork);

        assert!(query.source().is_some());
        assert!(query.cached().is_some());
    }

    #[test]
    fn test_network_only_ignores_store() {
        let vars = variables([("id", "7")]);
        let env = echo_env()
            .with_records(RecordSnapshot::new().with_response(&home(), &vars, json!("cached")));

        let query = env.load_query(&home(), &vars, FetchPolicy::NetworkOnly);

        assert!(query.cached().is_none());
        assert!(query.source().is_some());
    }

    #[test]
    fn test_store_only_miss_is_missing_data() {
        let env = echo_env();
        let query = env.load_query(&home(), &Variables::new(), FetchPolicy::StoreOnly);

        assert!(matches!(query.status(), QueryStatus::Failed(FetchError::MissingData(_))));
        assert!(!env.loads()[0].hit_network);
    }

    // === Record Tests ===

    #[test]
    fn test_network_response_lands_in_store() {
        let env = echo_env();
        let vars = variables([("id", "7")]);

        let query = env.load_query(&home(), &vars, FetchPolicy::StoreOrNetwork);
        block_on(query.settled()).unwrap();

        let exported = env.export_records();
        assert_eq!(exported.len(), 1);

        let again = env.load_query(&home(), &vars, FetchPolicy::StoreOrNetwork);
        assert!(again.source().is_none());
    }

    #[test]
    fn test_offline_fails() {
        let env = MemoryEnvironment::offline();
        let query = env.load_query(&home(), &Variables::new(), FetchPolicy::StoreOrNetwork);

        assert!(matches!(block_on(query.settled()), Err(FetchError::Network(_))));
        assert!(env.export_records().is_empty());
    }

    #[test]
    fn test_load_history_is_capped() {
        let env = echo_env();
        let total = LOAD_HISTORY_LIMIT + 10;

        for i in 0..total {
            env.load_query(&home(), &variables([("page", i as u64)]), FetchPolicy::StoreOnly);
        }

        let loads = env.loads();
        assert_eq!(loads.len(), LOAD_HISTORY_LIMIT);
        assert_eq!(env.load_count(), total);
        assert_eq!(loads[0].variables, variables([("page", 10u64)]));
        assert_eq!(
            loads[LOAD_HISTORY_LIMIT - 1].variables,
            variables([("page", (total - 1) as u64)])
        );
    }

    #[test]
    fn test_dispose_count() {
        let env = echo_env();
        let query = env.load_query(&home(), &Variables::new(), FetchPolicy::StoreOrNetwork);

        query.dispose();
        query.dispose();

        assert_eq!(env.dispose_count(), 1);
    }
}
