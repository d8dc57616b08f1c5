//! Suspense boundary as an explicit state machine.
//!
//! A boundary starts `NotStarted`, and each render pass evaluates the queries
//! it guards in render order: the first query that is not ready decides the
//! state. The state alone selects what the boundary shows.

use edge_data::{FetchError, PreloadedQuery, QueryStatus};

/// State of a suspense boundary for one render pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BoundaryState {
    /// Not evaluated yet.
    #[default]
    NotStarted,
    /// A guarded query is still loading.
    Loading,
    /// Every guarded query has data.
    Ready,
    /// A guarded query failed.
    Failed(FetchError),
}

impl BoundaryState {
    /// Evaluate queries in render order.
    pub fn evaluate<'a, I>(queries: I) -> Self
    where
        I: IntoIterator<Item = &'a PreloadedQuery>,
    {
        for query in queries {
            match query.status() {
                QueryStatus::Ready(_) => continue,
                QueryStatus::Loading => return Self::Loading,
                QueryStatus::Failed(error) => return Self::Failed(error),
            }
        }
        Self::Ready
    }

    /// Whether content can be rendered.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Pick what to show: fallback, error view, or real content.
    pub fn select<T>(
        &self,
        fallback: impl FnOnce() -> T,
        error_view: impl FnOnce(&FetchError) -> T,
        content: impl FnOnce() -> T,
    ) -> T {
        match self {
            Self::NotStarted | Self::Loading => fallback(),
            Self::Failed(error) => error_view(error),
            Self::Ready => content(),
        }
    }

    /// Name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

/// Queries still loading, in render order.
pub fn pending_queries<'a, I>(queries: I) -> Vec<PreloadedQuery>
where
    I: IntoIterator<Item = &'a PreloadedQuery>,
{
    queries
        .into_iter()
        .filter(|q| q.status().is_loading())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use edge_core::Variables;
    use edge_data::{FetchPolicy, QueryDescriptor, QueryOutcome, QuerySource};
    use futures::channel::oneshot;
    use serde_json::json;

    use super::*;

    fn ready() -> PreloadedQuery {
        PreloadedQuery::builder(QueryDescriptor::new("r", "R"), Variables::new(), FetchPolicy::StoreOrNetwork)
            .cached(json!({"ok": true}))
            .build()
    }

    fn failed() -> PreloadedQuery {
        PreloadedQuery::builder(QueryDescriptor::new("f", "F"), Variables::new(), FetchPolicy::StoreOrNetwork)
            .source(QuerySource::new(async { Err(FetchError::Network("x".into())) }))
            .build()
    }

    fn loading() -> (PreloadedQuery, oneshot::Sender<QueryOutcome>) {
        let (tx, rx) = oneshot::channel::<QueryOutcome>();
        let query = PreloadedQuery::builder(QueryDescriptor::new("l", "L"), Variables::new(), FetchPolicy::StoreOrNetwork)
            .source(QuerySource::new(async move { rx.await.unwrap_or(Err(FetchError::Aborted)) }))
            .build();
        (query, tx)
    }

    #[test]
    fn test_default_is_not_started() {
        let state = BoundaryState::default();
        assert_eq!(state, BoundaryState::NotStarted);
        assert_eq!(state.select(|| "fallback", |_| "error", || "content"), "fallback");
    }

    #[test]
    fn test_evaluate_all_ready() {
        let state = BoundaryState::evaluate([&ready(), &ready()]);
        assert!(state.is_ready());
        assert_eq!(state.select(|| "fallback", |_| "error", || "content"), "content");
    }

    #[test]
    fn test_evaluate_first_non_ready_wins() {
        let (slow, _tx) = loading();
        let broken = failed();

        assert_eq!(BoundaryState::evaluate([&ready(), &slow, &broken]), BoundaryState::Loading);
        assert!(matches!(
            BoundaryState::evaluate([&broken, &slow]),
            BoundaryState::Failed(FetchError::Network(_))
        ));
    }

    #[test]
    fn test_failed_selects_error_view() {
        let state = BoundaryState::evaluate([&failed()]);
        let view = state.select(|| "fallback".to_string(), |e| format!("error: {}", e), || "content".to_string());
        assert_eq!(view, "error: Network error: x");
    }

    #[test]
    fn test_loading_becomes_ready() {
        let (query, tx) = loading();
        assert_eq!(BoundaryState::evaluate([&query]), BoundaryState::Loading);
        assert_eq!(pending_queries([&query]).len(), 1);

        tx.send(Ok(Arc::new(json!(1)))).unwrap();

        assert_eq!(BoundaryState::evaluate([&query]), BoundaryState::Ready);
        assert!(pending_queries([&query]).is_empty());
    }
}
