//! Options for wiring a preloaded page.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use edge_core::{ExecutionContext, PropsResult, QueryVariables, RouteState, ServerPageContext};
use edge_data::{FetchError, FetchPolicy, QuerySet, SharedEnvironment};
use edge_hydration::HydrationSlot;

use crate::detector::ChangeDetection;

/// Derives per-slot variables from the router.
pub type VariablesFn = Arc<dyn Fn(&RouteState, &QuerySet) -> QueryVariables + Send + Sync>;

/// Creates the request-scoped server environment from the request and the
/// props the server loader produced.
pub type ServerEnvironmentFn<P> =
    Arc<dyn Fn(&ServerPageContext, &P) -> SharedEnvironment + Send + Sync>;

/// Creates the client environment. Called at most once per page.
pub type ClientEnvironmentFn = Arc<dyn Fn() -> SharedEnvironment + Send + Sync>;

/// Renders the error view for a failed query.
pub type ErrorViewFn = Arc<dyn Fn(&FetchError) -> String + Send + Sync>;

/// Produces page props, or a redirect, for one side of initial props.
#[async_trait]
pub trait PropsLoader<P>: Send + Sync {
    /// Load props for this navigation.
    async fn load(&self, context: &ExecutionContext) -> anyhow::Result<PropsResult<P>>;
}

/// Props loader backed by a synchronous function.
pub struct PropsFn<F>(pub F);

#[async_trait]
impl<P, F> PropsLoader<P> for PropsFn<F>
where
    P: Send + 'static,
    F: Fn(&ExecutionContext) -> anyhow::Result<PropsResult<P>> + Send + Sync,
{
    async fn load(&self, context: &ExecutionContext) -> anyhow::Result<PropsResult<P>> {
        (self.0)(context)
    }
}

/// Default derivation: route parameters and query string for every slot.
pub fn default_variables(route: &RouteState, descriptors: &QuerySet) -> QueryVariables {
    QueryVariables::from_route(route, descriptors.names())
}

/// Configuration for a preloaded page.
pub struct PreloadOptions<P> {
    /// Markup shown by a boundary while queries load.
    pub fallback: String,
    /// Policy for client loads and render-time re-fetches.
    pub fetch_policy: FetchPolicy,
    /// How the change detector compares variables.
    pub change_detection: ChangeDetection,
    pub(crate) variables_from_context: VariablesFn,
    pub(crate) create_server_environment: Option<ServerEnvironmentFn<P>>,
    pub(crate) create_client_environment: Option<ClientEnvironmentFn>,
    pub(crate) server_side_props: Option<Arc<dyn PropsLoader<P>>>,
    pub(crate) client_side_props: Option<Arc<dyn PropsLoader<P>>>,
    pub(crate) error_view: ErrorViewFn,
    pub(crate) hydration_slot: Option<Arc<HydrationSlot>>,
}

impl<P> PreloadOptions<P> {
    /// Create options with defaults: empty fallback, store-and-network
    /// re-fetches, identity change detection, the global hydration slot.
    pub fn new() -> Self {
        Self {
            fallback: String::new(),
            fetch_policy: FetchPolicy::default(),
            change_detection: ChangeDetection::default(),
            variables_from_context: Arc::new(default_variables),
            create_server_environment: None,
            create_client_environment: None,
            server_side_props: None,
            client_side_props: None,
            error_view: Arc::new(|error: &FetchError| {
                format!("<div role=\"alert\">{}</div>", error)
            }),
            hydration_slot: None,
        }
    }

    /// Set the boundary fallback markup.
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// Set the client re-fetch policy.
    pub fn with_fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.fetch_policy = policy;
        self
    }

    /// Set the change detection mode.
    pub fn with_change_detection(mut self, mode: ChangeDetection) -> Self {
        self.change_detection = mode;
        self
    }

    /// Replace the default variables derivation.
    pub fn with_variables<F>(mut self, f: F) -> Self
    where
        F: Fn(&RouteState, &QuerySet) -> QueryVariables + Send + Sync + 'static,
    {
        self.variables_from_context = Arc::new(f);
        self
    }

    /// Set the server environment factory.
    pub fn with_server_environment<F>(mut self, f: F) -> Self
    where
        F: Fn(&ServerPageContext, &P) -> SharedEnvironment + Send + Sync + 'static,
    {
        self.create_server_environment = Some(Arc::new(f));
        self
    }

    /// Set the client environment factory.
    pub fn with_client_environment<F>(mut self, f: F) -> Self
    where
        F: Fn() -> SharedEnvironment + Send + Sync + 'static,
    {
        self.create_client_environment = Some(Arc::new(f));
        self
    }

    /// Set the server props loader.
    pub fn with_server_props(mut self, loader: impl PropsLoader<P> + 'static) -> Self {
        self.server_side_props = Some(Arc::new(loader));
        self
    }

    /// Set the client props loader.
    pub fn with_client_props(mut self, loader: impl PropsLoader<P> + 'static) -> Self {
        self.client_side_props = Some(Arc::new(loader));
        self
    }

    /// Set the error view shown by a boundary for a failed query.
    pub fn with_error_view<F>(mut self, f: F) -> Self
    where
        F: Fn(&FetchError) -> String + Send + Sync + 'static,
    {
        self.error_view = Arc::new(f);
        self
    }

    /// Consult `slot` instead of the global hydration slot.
    pub fn with_hydration_slot(mut self, slot: Arc<HydrationSlot>) -> Self {
        self.hydration_slot = Some(slot);
        self
    }

    /// The hydration slot this page reads and writes.
    pub fn hydration_slot(&self) -> &HydrationSlot {
        match &self.hydration_slot {
            Some(slot) => slot,
            None => HydrationSlot::global(),
        }
    }

    pub(crate) fn variables(&self, route: &RouteState, descriptors: &QuerySet) -> QueryVariables {
        (self.variables_from_context)(route, descriptors)
    }
}

impl<P> Default for PreloadOptions<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for PreloadOptions<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreloadOptions")
            .field("fallback", &self.fallback)
            .field("fetch_policy", &self.fetch_policy)
            .field("change_detection", &self.change_detection)
            .field("server_environment", &self.create_server_environment.is_some())
            .field("client_environment", &self.create_client_environment.is_some())
            .field("server_side_props", &self.server_side_props.is_some())
            .field("client_side_props", &self.client_side_props.is_some())
            .finish_non_exhaustive()
    }
}
