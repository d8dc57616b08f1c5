//! Per-navigation preload bundles and their channels.

use std::fmt;

use edge_core::QueryVariables;
use edge_data::{PreloadedQueries, PreloadedQuery, QuerySet, SharedEnvironment};

use crate::channel::ContextChannel;

/// Channel for the bundle produced by the server branch of initial props.
pub static SERVER_CONTEXT: ContextChannel<ServerContext> =
    ContextChannel::new("edge-preload/server-context");

/// Channel for the bundle produced by the client branch of initial props.
pub static CLIENT_CONTEXT: ContextChannel<ClientContext> =
    ContextChannel::new("edge-preload/client-context");

/// Server bundle: everything needed to render and to serialize the cache.
#[derive(Clone)]
pub struct ServerContext {
    /// Variables each slot was loaded with.
    pub variables: QueryVariables,
    /// Descriptor slots of the page.
    pub descriptors: QuerySet,
    /// Flushed handles per slot.
    pub preloaded_queries: PreloadedQueries,
    /// Request-scoped environment the handles were loaded from.
    pub environment: SharedEnvironment,
}

impl ServerContext {
    /// Handle for a slot.
    pub fn query(&self, slot: &str) -> Option<&PreloadedQuery> {
        self.preloaded_queries.get(slot)
    }
}

impl fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerContext")
            .field("variables", &self.variables)
            .field("descriptors", &self.descriptors)
            .field("preloaded_queries", &self.preloaded_queries)
            .finish_non_exhaustive()
    }
}

/// Client bundle: handles loaded during a client-side navigation.
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    /// Handles per slot.
    pub preloaded_queries: PreloadedQueries,
}

impl ClientContext {
    /// Handle for a slot.
    pub fn query(&self, slot: &str) -> Option<&PreloadedQuery> {
        self.preloaded_queries.get(slot)
    }
}
