//! A mounted page: render passes, re-fetches, and handle disposal.

use edge_core::{LifecyclePhase, QueryVariables, RouteState};
use edge_data::{PreloadedQueries, PreloadedQuery, SharedEnvironment};
use edge_streaming::{flush_all, pending_queries, BoundaryState};

use crate::detector::VariableChangeDetector;
use crate::error::{PreloadError, PreloadResult};
use crate::page::{Page, PageProps, PreloadedPage, ReadyQueries};

/// Where a mounted instance got its initial query handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSource {
    /// Handles loaded by the client branch of initial props.
    ClientContext,
    /// Handles loaded and flushed by the server branch of initial props.
    ServerContext,
    /// Handles rehydrated from the serialized state.
    SerializedState,
    /// No source was present.
    Empty,
}

/// What one render pass produced.
#[derive(Debug, Clone)]
pub enum RenderOutcome {
    /// Content rendered directly, with no boundary.
    Rendered(String),
    /// Rendered inside a boundary; `state` picked fallback, error view, or content.
    Boundary {
        /// Boundary state for this pass.
        state: BoundaryState,
        /// Markup the state selected.
        html: String,
    },
    /// Rendered without a boundary while queries are loading. Render again
    /// once these settle.
    Suspended(Vec<PreloadedQuery>),
}

impl RenderOutcome {
    /// Markup, unless suspended.
    pub fn html(&self) -> Option<&str> {
        match self {
            Self::Rendered(html) | Self::Boundary { html, .. } => Some(html),
            Self::Suspended(_) => None,
        }
    }

    /// Whether the pass rendered inside a boundary.
    pub fn has_boundary(&self) -> bool {
        matches!(self, Self::Boundary { .. })
    }
}

/// A mounted page instance.
///
/// Owns the query handles it renders from and disposes each exactly once:
/// on replacement by a re-fetch, or on unmount.
pub struct PageInstance<'p, C: Page> {
    page: &'p PreloadedPage<C>,
    seed: SeedSource,
    queries: PreloadedQueries,
    environment: Option<SharedEnvironment>,
    detector: VariableChangeDetector,
    client_side_navigation: bool,
    disposed: bool,
}

impl<'p, C: Page> PageInstance<'p, C> {
    pub(crate) fn new(
        page: &'p PreloadedPage<C>,
        seed: SeedSource,
        queries: PreloadedQueries,
        environment: Option<SharedEnvironment>,
    ) -> Self {
        tracing::debug!(seed = ?seed, queries = queries.len(), "page mounted");
        Self {
            page,
            seed,
            queries,
            environment,
            detector: VariableChangeDetector::new(page.options().change_detection),
            client_side_navigation: seed == SeedSource::ClientContext,
            disposed: false,
        }
    }

    /// Where the initial handles came from.
    pub fn seed_source(&self) -> SeedSource {
        self.seed
    }

    /// Whether the page was reached by client-side navigation.
    pub fn is_client_side_navigation(&self) -> bool {
        self.client_side_navigation
    }

    /// The change detector.
    pub fn detector(&self) -> &VariableChangeDetector {
        &self.detector
    }

    /// Current handle for a slot.
    pub fn query(&self, slot: &str) -> Option<&PreloadedQuery> {
        self.queries.get(slot)
    }

    /// Current handles.
    pub fn queries(&self) -> &PreloadedQueries {
        &self.queries
    }

    /// Run one render pass for `props` at `route`.
    ///
    /// Re-issues loads whose variables changed, updates the change detector,
    /// and renders inside a boundary after a client-side navigation or once
    /// the variables changed. Otherwise renders directly so the first paint
    /// matches the server markup.
    pub fn render(
        &mut self,
        props: &PageProps<C::Props>,
        route: &RouteState,
    ) -> PreloadResult<RenderOutcome> {
        let variables = self.page.options().variables(route, self.page.descriptors());
        self.sync_queries(&variables);
        self.detector.observe(route.revision, &variables);

        let use_boundary = self.client_side_navigation || self.detector.has_changed();
        let ordered: Vec<&PreloadedQuery> = self
            .page
            .descriptors()
            .names()
            .filter_map(|slot| self.queries.get(slot))
            .collect();
        let state = BoundaryState::evaluate(ordered.iter().copied());

        tracing::debug!(
            phase = %LifecyclePhase::Rendered,
            revision = route.revision,
            boundary = use_boundary,
            state = state.name(),
            "render pass"
        );

        if use_boundary {
            let options = self.page.options();
            let html = state.select(
                || options.fallback.clone(),
                |error| (options.error_view)(error),
                || self.render_content(props),
            );
            return Ok(RenderOutcome::Boundary { state, html });
        }

        match state {
            BoundaryState::Ready => Ok(RenderOutcome::Rendered(self.render_content(props))),
            BoundaryState::Failed(error) => Err(PreloadError::Fetch(error)),
            BoundaryState::NotStarted | BoundaryState::Loading => {
                Ok(RenderOutcome::Suspended(pending_queries(ordered)))
            }
        }
    }

    /// Render, waiting out suspensions until the pass produces markup.
    pub async fn render_settled(
        &mut self,
        props: &PageProps<C::Props>,
        route: &RouteState,
    ) -> PreloadResult<RenderOutcome> {
        loop {
            match self.render(props, route)? {
                RenderOutcome::Suspended(pending) => {
                    flush_all(&pending).await;
                }
                outcome => return Ok(outcome),
            }
        }
    }

    fn render_content(&self, props: &PageProps<C::Props>) -> String {
        let ready = ReadyQueries::from_queries(&self.queries);
        self.page.component().render(&props.props, &ready)
    }

    /// Load every slot whose handle is missing, disposed, or was loaded with
    /// other variables. Replaced handles are disposed immediately.
    fn sync_queries(&mut self, variables: &QueryVariables) {
        let page = self.page;
        let stale: Vec<(&str, _)> = page
            .descriptors()
            .iter()
            .filter_map(|(slot, descriptor)| {
                let vars = variables.for_slot(slot);
                let current = self.queries.get(slot);
                let fresh = current.is_some_and(|q| !q.is_disposed() && *q.variables() == vars);
                (!fresh).then_some((slot, (descriptor, vars)))
            })
            .collect();
        if stale.is_empty() {
            return;
        }

        let environment = match self.environment.clone().or_else(|| page.client_environment()) {
            Some(environment) => environment,
            None => {
                tracing::warn!(
                    stale = stale.len(),
                    "no environment to load queries; rendering with current handles"
                );
                return;
            }
        };
        self.environment = Some(environment.clone());

        let fetch_policy = page.options().fetch_policy;
        for (slot, (descriptor, vars)) in stale {
            let query = environment.load_query(descriptor, &vars, fetch_policy);
            tracing::debug!(
                slot,
                query = %descriptor,
                policy = %fetch_policy,
                "query re-issued"
            );
            if let Some(replaced) = self.queries.insert(slot.to_string(), query) {
                replaced.dispose();
            }
        }
    }

    /// Dispose every handle and unmount.
    pub fn unmount(mut self) {
        self.dispose_all();
    }

    /// Unmount without disposing the handles in `carried`, which stay owned
    /// by whoever passed them in. Handles this instance loaded itself are
    /// disposed.
    pub(crate) fn release(mut self, carried: &PreloadedQueries) {
        self.disposed = true;
        let mut disposed = 0;
        for (slot, query) in &self.queries {
            if !carried.get(slot).is_some_and(|held| held.ptr_eq(query)) {
                query.dispose();
                disposed += 1;
            }
        }
        tracing::debug!(
            phase = %LifecyclePhase::Disposed,
            queries = self.queries.len(),
            disposed,
            "page released"
        );
    }

    fn dispose_all(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        for query in self.queries.values() {
            query.dispose();
        }
        tracing::debug!(
            phase = %LifecyclePhase::Disposed,
            queries = self.queries.len(),
            "page unmounted"
        );
    }
}

impl<C: Page> Drop for PageInstance<'_, C> {
    fn drop(&mut self) {
        self.dispose_all();
    }
}
