use std::future::Future;

use anyhow::Result;
use futures::stream::{self, StreamExt};

/// Default in-flight ceiling for bulk task fan-out.
///
/// Matches the connection-pool ceiling of the underlying transport, so
/// in-flight work never exceeds available connections.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Execute a set of independent fallible tasks with a bounded number in
/// flight, collecting every outcome.
///
/// The returned vector corresponds 1:1, in order, with the input tasks even
/// though completion order is unspecified. A failing task never cancels its
/// siblings: all submitted tasks run to completion, so bulk operations make
/// maximal partial progress rather than failing fast. Callers decide whether
/// any individual failure constitutes overall failure.
///
/// `max_concurrent` values below 1 are treated as 1.
pub async fn run_all<T, F>(
    tasks: impl IntoIterator<Item = F>,
    max_concurrent: usize,
) -> Vec<Result<T>>
where
    F: Future<Output = Result<T>>,
{
    let indexed = tasks
        .into_iter()
        .enumerate()
        .map(|(index, task)| async move { (index, task.await) });

    let mut outcomes: Vec<(usize, Result<T>)> = stream::iter(indexed)
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    outcomes.sort_by_key(|(index, _)| *index);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}
