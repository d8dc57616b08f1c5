//! Preloaded query handles and their completion signals.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use edge_core::Variables;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;

use crate::descriptor::QueryDescriptor;
use crate::error::FetchError;
use crate::policy::FetchPolicy;

/// Outcome of a fetch, shared by every subscriber.
pub type QueryOutcome = Result<Arc<Value>, FetchError>;

/// Preloaded queries keyed by descriptor slot.
pub type PreloadedQueries = BTreeMap<String, PreloadedQuery>;

/// Subscribable completion signal of an in-flight fetch.
///
/// The fetch makes progress whenever a subscriber polls it, so a source is
/// driven by whoever waits on it first (the server flush, or the host after
/// a suspended render).
#[derive(Clone)]
pub struct QuerySource {
    completion: Shared<BoxFuture<'static, QueryOutcome>>,
}

impl QuerySource {
    /// Wrap a fetch future.
    pub fn new<F>(fetch: F) -> Self
    where
        F: Future<Output = QueryOutcome> + Send + 'static,
    {
        Self {
            completion: fetch.boxed().shared(),
        }
    }

    /// A future resolving with the fetch outcome.
    pub fn completion(&self) -> impl Future<Output = QueryOutcome> + Send + 'static {
        self.completion.clone()
    }

    /// Outcome if already known. Polls the fetch once without waiting.
    pub fn poll_outcome(&self) -> Option<QueryOutcome> {
        if let Some(outcome) = self.completion.peek() {
            return Some(outcome.clone());
        }
        self.completion.clone().now_or_never()
    }
}

impl fmt::Debug for QuerySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySource")
            .field("settled", &self.completion.peek().is_some())
            .finish()
    }
}

/// Observable state of a preloaded query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryStatus {
    /// The fetch has not completed and nothing renderable is cached.
    Loading,
    /// Data is available.
    Ready(Arc<Value>),
    /// The fetch failed.
    Failed(FetchError),
}

impl QueryStatus {
    /// Whether the query is still loading.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

type Release = Box<dyn FnOnce() + Send>;

struct Inner {
    id: u64,
    descriptor: QueryDescriptor,
    variables: Variables,
    fetch_policy: FetchPolicy,
    source: Option<QuerySource>,
    cached: Option<Arc<Value>>,
    disposed: AtomicBool,
    release: Mutex<Option<Release>>,
}

/// Handle to an in-flight or completed fetch for one descriptor and one
/// variable set.
///
/// Clones share the same handle. `dispose` releases data-layer resources
/// exactly once no matter how many clones call it.
#[derive(Clone)]
pub struct PreloadedQuery {
    inner: Arc<Inner>,
}

impl PreloadedQuery {
    /// Start building a handle.
    pub fn builder(
        descriptor: QueryDescriptor,
        variables: Variables,
        fetch_policy: FetchPolicy,
    ) -> PreloadedQueryBuilder {
        PreloadedQueryBuilder {
            descriptor,
            variables,
            fetch_policy,
            source: None,
            cached: None,
            release: None,
        }
    }

    /// Process-unique handle id, for logs.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Descriptor this handle loads.
    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.inner.descriptor
    }

    /// Variables this handle was loaded with.
    pub fn variables(&self) -> &Variables {
        &self.inner.variables
    }

    /// Policy this handle was loaded with.
    pub fn fetch_policy(&self) -> FetchPolicy {
        self.inner.fetch_policy
    }

    /// Network-backed completion signal. `None` when the store satisfied the load.
    pub fn source(&self) -> Option<&QuerySource> {
        self.inner.source.as_ref()
    }

    /// Data read from the store at load time.
    pub fn cached(&self) -> Option<&Arc<Value>> {
        self.inner.cached.as_ref()
    }

    /// Current state of the query.
    pub fn status(&self) -> QueryStatus {
        if self.is_disposed() {
            return QueryStatus::Failed(FetchError::Disposed);
        }
        let outcome = self.inner.source.as_ref().and_then(QuerySource::poll_outcome);
        match (outcome, &self.inner.cached) {
            (Some(Ok(data)), _) => QueryStatus::Ready(data),
            (Some(Err(e)), _) => QueryStatus::Failed(e),
            (None, Some(data)) => QueryStatus::Ready(data.clone()),
            (None, None) if self.inner.source.is_some() => QueryStatus::Loading,
            (None, None) => QueryStatus::Failed(FetchError::MissingData(
                self.inner.descriptor.to_string(),
            )),
        }
    }

    /// Wait for the fetch to settle.
    pub fn settled(&self) -> impl Future<Output = QueryOutcome> + Send + 'static {
        let source = self.inner.source.clone();
        let cached = self.inner.cached.clone();
        let label = self.inner.descriptor.to_string();
        async move {
            match (source, cached) {
                (Some(source), _) => source.completion().await,
                (None, Some(data)) => Ok(data),
                (None, None) => Err(FetchError::MissingData(label)),
            }
        }
    }

    /// Release data-layer resources. Only the first call has an effect.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let release = self
            .inner
            .release
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        tracing::debug!(
            query = %self.inner.descriptor,
            handle = self.inner.id,
            "query disposed"
        );
        if let Some(release) = release {
            release();
        }
    }

    /// Whether `dispose` has been called.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Whether two values are clones of the same handle.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for PreloadedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreloadedQuery")
            .field("id", &self.inner.id)
            .field("descriptor", &self.inner.descriptor)
            .field("variables", &self.inner.variables)
            .field("fetch_policy", &self.inner.fetch_policy)
            .field("source", &self.inner.source)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Builder used by environments to assemble handles.
pub struct PreloadedQueryBuilder {
    descriptor: QueryDescriptor,
    variables: Variables,
    fetch_policy: FetchPolicy,
    source: Option<QuerySource>,
    cached: Option<Arc<Value>>,
    release: Option<Release>,
}

impl PreloadedQueryBuilder {
    /// Attach a network-backed completion signal.
    pub fn source(mut self, source: QuerySource) -> Self {
        self.source = Some(source);
        self
    }

    /// Attach data read from the store.
    pub fn cached(mut self, data: Value) -> Self {
        self.cached = Some(Arc::new(data));
        self
    }

    /// Run `release` on the first `dispose`.
    pub fn on_dispose(mut self, release: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    /// Build the handle.
    pub fn build(self) -> PreloadedQuery {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        PreloadedQuery {
            inner: Arc::new(Inner {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                descriptor: self.descriptor,
                variables: self.variables,
                fetch_policy: self.fetch_policy,
                source: self.source,
                cached: self.cached,
                disposed: AtomicBool::new(false),
                release: Mutex::new(self.release),
            }),
        }
    }
}
