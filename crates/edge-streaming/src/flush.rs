//! Explicit flush control: wait for preloaded queries to settle.
//!
//! The server must not serialize a response whose embedded query data is
//! still loading, but one slow or failing query must not abort the others.

use std::time::{Duration, Instant};

use edge_data::PreloadedQuery;
use futures::future::join_all;

/// How one query settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing to wait for; the store satisfied the load.
    Immediate,
    /// The fetch completed.
    Completed,
    /// The fetch failed. Settled all the same.
    Failed,
}

/// Summary of a settle-all flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Queries that needed no wait.
    pub immediate: usize,
    /// Queries whose fetch completed.
    pub completed: usize,
    /// Queries whose fetch failed.
    pub failed: usize,
    /// Wall time spent waiting.
    pub elapsed: Duration,
}

impl FlushReport {
    /// Total number of queries flushed.
    pub fn total(&self) -> usize {
        self.immediate + self.completed + self.failed
    }

    fn record(&mut self, outcome: FlushOutcome) {
        match outcome {
            FlushOutcome::Immediate => self.immediate += 1,
            FlushOutcome::Completed => self.completed += 1,
            FlushOutcome::Failed => self.failed += 1,
        }
    }
}

/// Wait for one query to settle. Never fails.
///
/// Resolves immediately when the query has no source.
pub async fn flush(query: &PreloadedQuery) -> FlushOutcome {
    let Some(source) = query.source() else {
        return FlushOutcome::Immediate;
    };
    match source.completion().await {
        Ok(_) => FlushOutcome::Completed,
        Err(error) => {
            tracing::warn!(
                query = %query.descriptor(),
                error = %error,
                "query failed during flush"
            );
            FlushOutcome::Failed
        }
    }
}

/// Wait for every query to settle, whatever the individual outcome.
pub async fn flush_all<'a, I>(queries: I) -> FlushReport
where
    I: IntoIterator<Item = &'a PreloadedQuery>,
{
    let start = Instant::now();
    let outcomes = join_all(queries.into_iter().map(flush)).await;

    let mut report = FlushReport::default();
    for outcome in outcomes {
        report.record(outcome);
    }
    report.elapsed = start.elapsed();

    tracing::debug!(
        completed = report.completed,
        failed = report.failed,
        immediate = report.immediate,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "flush settled"
    );
    report
}
