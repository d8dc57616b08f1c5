//! Route state, request context, and the explicit server/client branch.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Unique request identifier for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        Self(format!(
            "{:x}-{:x}",
            nanos,
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extracted route parameters (e.g., `:id` from `/products/:id`).
pub type RouteParams = HashMap<String, String>;

/// Query string parameters.
pub type QueryParams = HashMap<String, String>;

/// Snapshot of the router for one render pass.
///
/// `revision` is bumped by the router on every navigation. Two snapshots with
/// the same revision describe the same router state, even if they were cloned
/// separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteState {
    /// Request path.
    pub path: String,
    /// Extracted route parameters.
    pub params: RouteParams,
    /// Query string parameters.
    pub query: QueryParams,
    /// Navigation counter.
    pub revision: u64,
}

impl RouteState {
    /// Create a route state for a path at revision zero.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Add a query string parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a route parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Produce the state the router reports after navigating to `path`.
    pub fn navigate(&self, path: impl Into<String>, query: QueryParams) -> Self {
        Self {
            path: path.into(),
            params: RouteParams::new(),
            query,
            revision: self.revision + 1,
        }
    }
}

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

/// Server-side request context passed to props loaders and environment factories.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: RequestId,
    /// HTTP method.
    pub method: Method,
    /// Router snapshot for this request.
    pub route: RouteState,
}

impl RequestContext {
    /// Create a new request context.
    pub fn new(method: Method, route: RouteState) -> Self {
        Self {
            request_id: RequestId::generate(),
            method,
            route,
        }
    }
}

/// Host HTTP response the server branch writes redirects into.
pub trait ResponseWriter: Send + Sync {
    /// Write a complete redirect response; nothing else is written afterwards.
    fn write_redirect(&self, response: http::Response<()>);
}

/// Client router capability used for client-side redirects.
pub trait Navigator: Send + Sync {
    /// Navigate to `destination` through client routing.
    fn push(&self, destination: &str);
}

/// Response writer that keeps the written response for the host to send.
#[derive(Debug, Default)]
pub struct BufferedResponse {
    written: Mutex<Option<http::Response<()>>>,
}

impl BufferedResponse {
    /// Create an empty buffered response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Status of the written response, if any.
    pub fn status(&self) -> Option<http::StatusCode> {
        self.lock().as_ref().map(|r| r.status())
    }

    /// `Location` header of the written response, if any.
    pub fn location(&self) -> Option<String> {
        self.lock().as_ref().and_then(|r| {
            r.headers()
                .get(http::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        })
    }

    /// Take the written response.
    pub fn take(&self) -> Option<http::Response<()>> {
        self.lock().take()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<http::Response<()>>> {
        self.written.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ResponseWriter for BufferedResponse {
    fn write_redirect(&self, response: http::Response<()>) {
        *self.lock() = Some(response);
    }
}

/// Context for the server branch of initial props.
#[derive(Clone)]
pub struct ServerPageContext {
    /// The incoming request.
    pub request: RequestContext,
    /// Response the host will send.
    pub response: Arc<dyn ResponseWriter>,
}

impl ServerPageContext {
    /// Create a server page context.
    pub fn new(request: RequestContext, response: Arc<dyn ResponseWriter>) -> Self {
        Self { request, response }
    }

    /// Router snapshot for this request.
    pub fn route(&self) -> &RouteState {
        &self.request.route
    }
}

impl fmt::Debug for ServerPageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerPageContext")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

/// Context for the client branch of initial props.
#[derive(Clone)]
pub struct ClientPageContext {
    /// Router snapshot for the navigation.
    pub route: RouteState,
    /// Client router.
    pub navigator: Arc<dyn Navigator>,
}

impl ClientPageContext {
    /// Create a client page context.
    pub fn new(route: RouteState, navigator: Arc<dyn Navigator>) -> Self {
        Self { route, navigator }
    }
}

impl fmt::Debug for ClientPageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientPageContext")
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}

/// Which side initial props run on. Passed explicitly, never inferred.
#[derive(Debug, Clone)]
pub enum ExecutionContext {
    /// Rendering a response on the server.
    Server(ServerPageContext),
    /// Navigating on the client.
    Client(ClientPageContext),
}

impl ExecutionContext {
    /// Router snapshot, regardless of side.
    pub fn route(&self) -> &RouteState {
        match self {
            Self::Server(ctx) => ctx.route(),
            Self::Client(ctx) => &ctx.route,
        }
    }

    /// Whether this is the server branch.
    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server(_))
    }

    /// Short name for log fields.
    pub fn side(&self) -> &'static str {
        match self {
            Self::Server(_) => "server",
            Self::Client(_) => "client",
        }
    }
}
