//! Wiring a page component to its preloaded queries.

use std::collections::BTreeMap;
use std::sync::Arc;

use edge_core::{
    ClientPageContext, ExecutionContext, LifecyclePhase, PropsResult, QueryVariables, Redirect,
    RouteState, ServerPageContext,
};
use edge_data::{
    EnvironmentCell, FetchPolicy, PreloadedQueries, QueryStatus, QuerySet, SharedEnvironment,
};
use edge_hydration::{
    resolve_on_client, ClientContext, ContextCarrier, SerializedState, ServerContext,
    CLIENT_CONTEXT, SERVER_CONTEXT,
};
use edge_streaming::{flush_all, DocumentShell};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PreloadError, PreloadResult};
use crate::instance::{PageInstance, RenderOutcome, SeedSource};
use crate::options::{PreloadOptions, PropsLoader};

/// A page component rendered with preloaded query data.
pub trait Page: Send + Sync {
    /// Props produced by the page's props loaders.
    type Props: Default + Send + Sync + 'static;

    /// Render the page once every query it reads has data.
    fn render(&self, props: &Self::Props, queries: &ReadyQueries) -> String;
}

/// Query data available to a render, keyed by slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadyQueries {
    data: BTreeMap<String, Arc<Value>>,
}

impl ReadyQueries {
    pub(crate) fn from_queries(queries: &PreloadedQueries) -> Self {
        let data = queries
            .iter()
            .filter_map(|(slot, query)| match query.status() {
                QueryStatus::Ready(data) => Some((slot.clone(), data)),
                _ => None,
            })
            .collect();
        Self { data }
    }

    /// Data for a slot.
    pub fn get(&self, slot: &str) -> Option<&Value> {
        self.data.get(slot).map(|data| data.as_ref())
    }

    /// Iterate slots and their data.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.data.iter().map(|(slot, data)| (slot.as_str(), data.as_ref()))
    }

    /// Number of slots with data.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether no slot has data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Props handed to the host: the page's own props plus context carriers.
///
/// The carriers serialize as empty maps, so props sent to the client through
/// the host's own serialization arrive without contexts and the client
/// falls back to the serialized state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageProps<P> {
    /// Props from the props loader.
    pub props: P,
    /// Carrier for the server context.
    #[serde(default)]
    pub server_context: ContextCarrier,
    /// Carrier for the client context.
    #[serde(default)]
    pub client_context: ContextCarrier,
    /// Redirect that short-circuited initial props.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Redirect>,
}

impl<P> PageProps<P> {
    /// Props with no contexts.
    pub fn new(props: P) -> Self {
        Self {
            props,
            server_context: ContextCarrier::empty(),
            client_context: ContextCarrier::empty(),
            redirect: None,
        }
    }

    /// The attached server context.
    pub fn server_context(&self) -> Option<Arc<ServerContext>> {
        SERVER_CONTEXT.read(Some(&self.server_context))
    }

    /// The attached client context.
    pub fn client_context(&self) -> Option<Arc<ClientContext>> {
        CLIENT_CONTEXT.read(Some(&self.client_context))
    }
}

impl<P: Default> PageProps<P> {
    fn redirected(redirect: Redirect) -> Self {
        Self {
            redirect: Some(redirect),
            ..Self::new(P::default())
        }
    }
}

/// Server render output: page markup plus the state to embed for the client.
#[derive(Debug, Clone)]
pub struct ServerRender {
    /// Page markup.
    pub html: String,
    /// Captured cache snapshot. Absent when the props carried no server context.
    pub state: Option<SerializedState>,
}

impl ServerRender {
    /// Render the full document, embedding the state script when present.
    pub fn document(&self, shell: DocumentShell) -> PreloadResult<String> {
        let shell = match &self.state {
            Some(state) => shell.with_state_script(state.to_script_tag()?),
            None => shell,
        };
        Ok(shell.render(&self.html))
    }
}

/// Wrap `component` so its `descriptors` are preloaded per `options`.
pub fn wire<C: Page>(
    component: C,
    descriptors: QuerySet,
    options: PreloadOptions<C::Props>,
) -> PreloadedPage<C> {
    PreloadedPage {
        component,
        descriptors,
        options,
        client_environment: EnvironmentCell::new(),
    }
}

/// A page component wired to its query descriptors.
pub struct PreloadedPage<C: Page> {
    component: C,
    descriptors: QuerySet,
    options: PreloadOptions<C::Props>,
    client_environment: EnvironmentCell,
}

impl<C: Page> PreloadedPage<C> {
    /// Descriptor slots of the page.
    pub fn descriptors(&self) -> &QuerySet {
        &self.descriptors
    }

    /// Page options.
    pub fn options(&self) -> &PreloadOptions<C::Props> {
        &self.options
    }

    pub(crate) fn component(&self) -> &C {
        &self.component
    }

    /// Produce props for one navigation, on the side `context` names.
    pub async fn initial_props(
        &self,
        context: &ExecutionContext,
    ) -> PreloadResult<PageProps<C::Props>> {
        tracing::debug!(
            phase = %LifecyclePhase::InitialProps,
            side = context.side(),
            path = %context.route().path,
            "producing initial props"
        );
        match context {
            ExecutionContext::Server(server) => self.server_props(context, server).await,
            ExecutionContext::Client(client) => self.client_props(context, client).await,
        }
    }

    async fn server_props(
        &self,
        context: &ExecutionContext,
        server: &ServerPageContext,
    ) -> PreloadResult<PageProps<C::Props>> {
        let props = match self.load_props(self.options.server_side_props.as_ref(), context).await? {
            PropsResult::Props(props) => props,
            PropsResult::Redirect(redirect) => {
                tracing::info!(
                    phase = %LifecyclePhase::Redirected,
                    side = "server",
                    destination = %redirect.destination,
                    status = redirect.status(),
                    "initial props redirected"
                );
                let response = redirect.to_response().map_err(|error| {
                    tracing::warn!(
                        destination = %redirect.destination,
                        error = %error,
                        "redirect destination cannot form a response"
                    );
                    PreloadError::Redirect(error)
                })?;
                server.response.write_redirect(response);
                return Ok(PageProps::redirected(redirect));
            }
        };

        let create_environment = self
            .options
            .create_server_environment
            .as_ref()
            .ok_or(PreloadError::MissingEnvironment("server"))?;
        let environment = create_environment(server, &props);
        let variables = self.options.variables(server.route(), &self.descriptors);
        let preloaded_queries =
            self.load_all(&environment, &variables, FetchPolicy::StoreOrNetwork);

        let report = flush_all(preloaded_queries.values()).await;
        tracing::info!(
            phase = %LifecyclePhase::Flushed,
            request_id = %server.request.request_id,
            queries = report.total(),
            failed = report.failed,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "server queries settled"
        );

        let server_context = SERVER_CONTEXT.attach(ServerContext {
            variables,
            descriptors: self.descriptors.clone(),
            preloaded_queries,
            environment,
        });
        Ok(PageProps {
            server_context,
            ..PageProps::new(props)
        })
    }

    async fn client_props(
        &self,
        context: &ExecutionContext,
        client: &ClientPageContext,
    ) -> PreloadResult<PageProps<C::Props>> {
        let props = match self.load_props(self.options.client_side_props.as_ref(), context).await? {
            PropsResult::Props(props) => props,
            PropsResult::Redirect(redirect) => {
                tracing::info!(
                    phase = %LifecyclePhase::Redirected,
                    side = "client",
                    destination = %redirect.destination,
                    "initial props redirected"
                );
                client.navigator.push(&redirect.destination);
                return Ok(PageProps::redirected(redirect));
            }
        };

        let environment = self
            .client_environment()
            .ok_or(PreloadError::MissingEnvironment("client"))?;
        let variables = self.options.variables(&client.route, &self.descriptors);
        let preloaded_queries = self.load_all(&environment, &variables, self.options.fetch_policy);

        tracing::info!(
            phase = %LifecyclePhase::InitialProps,
            side = "client",
            queries = preloaded_queries.len(),
            policy = %self.options.fetch_policy,
            "client queries issued"
        );
        let client_context = CLIENT_CONTEXT.attach(ClientContext { preloaded_queries });
        Ok(PageProps {
            client_context,
            ..PageProps::new(props)
        })
    }

    async fn load_props(
        &self,
        loader: Option<&Arc<dyn PropsLoader<C::Props>>>,
        context: &ExecutionContext,
    ) -> PreloadResult<PropsResult<C::Props>> {
        match loader {
            Some(loader) => loader.load(context).await.map_err(PreloadError::Props),
            None => Ok(PropsResult::default()),
        }
    }

    /// Start a load per descriptor, in declaration order.
    fn load_all(
        &self,
        environment: &SharedEnvironment,
        variables: &QueryVariables,
        fetch_policy: FetchPolicy,
    ) -> PreloadedQueries {
        self.descriptors
            .iter()
            .map(|(slot, descriptor)| {
                let query =
                    environment.load_query(descriptor, &variables.for_slot(slot), fetch_policy);
                (slot.to_string(), query)
            })
            .collect()
    }

    /// The session's client environment, created on first use.
    pub(crate) fn client_environment(&self) -> Option<SharedEnvironment> {
        let create = self.options.create_client_environment.as_ref()?;
        Some(self.client_environment.get_or_init(|| create()))
    }

    /// Mount an instance for `props` at `route`.
    ///
    /// Queries are seeded from the first source present: client context,
    /// server context, then the serialized state in the hydration slot.
    pub fn mount(&self, props: &PageProps<C::Props>, route: &RouteState) -> PageInstance<'_, C> {
        self.mount_with(props, route, true)
    }

    fn mount_with(
        &self,
        props: &PageProps<C::Props>,
        route: &RouteState,
        hydrate: bool,
    ) -> PageInstance<'_, C> {
        if let Some(context) = props.client_context() {
            return PageInstance::new(
                self,
                SeedSource::ClientContext,
                context.preloaded_queries.clone(),
                self.client_environment(),
            );
        }
        if let Some(context) = props.server_context() {
            return PageInstance::new(
                self,
                SeedSource::ServerContext,
                context.preloaded_queries.clone(),
                Some(context.environment.clone()),
            );
        }
        if hydrate {
            if let Some(environment) = self.client_environment() {
                if let Some(state) = self.options.hydration_slot().take() {
                    let queries = resolve_on_client(&state, || environment.clone());
                    return PageInstance::new(
                        self,
                        SeedSource::SerializedState,
                        queries,
                        Some(environment),
                    );
                }
            }
        }
        tracing::debug!(path = %route.path, "no preload source; mounting without queries");
        PageInstance::new(self, SeedSource::Empty, PreloadedQueries::new(), self.client_environment())
    }

    /// Render the page on the server from flushed initial props.
    ///
    /// The handles carried by `props` stay live and owned by the props, so
    /// rendering the same props again reuses them. A carried handle is only
    /// disposed when `route` derives other variables and a re-fetch replaces
    /// it. The hydration slot is never consulted.
    pub fn render_server(
        &self,
        props: &PageProps<C::Props>,
        route: &RouteState,
    ) -> PreloadResult<ServerRender> {
        let server_context = props.server_context();
        let state = server_context
            .as_ref()
            .map(|context| SerializedState::capture(context));
        let carried = props
            .client_context()
            .map(|context| context.preloaded_queries.clone())
            .or_else(|| server_context.map(|context| context.preloaded_queries.clone()))
            .unwrap_or_default();

        let mut instance = self.mount_with(props, route, false);
        let outcome = instance.render(props, route);
        instance.release(&carried);
        let html = match outcome? {
            RenderOutcome::Rendered(html) | RenderOutcome::Boundary { html, .. } => html,
            RenderOutcome::Suspended(pending) => {
                tracing::warn!(
                    pending = pending.len(),
                    "server render reached unsettled queries; emitting fallback"
                );
                self.options.fallback.clone()
            }
        };

        tracing::info!(
            phase = %LifecyclePhase::Rendered,
            side = "server",
            records = state.as_ref().map_or(0, |s| s.records.len()),
            "server render complete"
        );
        Ok(ServerRender { html, state })
    }

    /// Parse state embedded in the document and write it into the hydration
    /// slot for the first mount to take.
    pub fn bootstrap_from_document_state(&self, json: &str) -> PreloadResult<()> {
        let state = SerializedState::from_json(json)?;
        self.options.hydration_slot().write(state)?;
        Ok(())
    }
}
