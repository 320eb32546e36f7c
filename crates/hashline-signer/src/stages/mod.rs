//! Signing stages and the per-item task plumbing they share

mod combine;
mod multi_hash;
mod single_hash;
mod source;

pub use combine::{CombineResults, SEPARATOR, combine};
pub use multi_hash::{MULTI_HASH_ROUNDS, MultiHash, multi_hash};
pub use single_hash::{SingleHash, single_hash};
pub use source::Feed;

use std::future::Future;

use hashline_core::{Inbox, StageError};
use tokio::task::JoinSet;

/// Run a synchronous (possibly slow) call on the blocking pool.
///
/// The call is spawned immediately, before the returned future is polled,
/// so several of these start running in parallel as soon as they are created.
pub(crate) fn run_blocking<R, F>(f: F) -> impl Future<Output = Result<R, StageError>> + Send
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let handle = tokio::task::spawn_blocking(f);
    async move { handle.await.map_err(StageError::from) }
}

/// Spawn one task per received item and wait for all of them.
///
/// Items are processed concurrently. The first failing task aborts the rest
/// (they are dropped with the `JoinSet`) and its error is returned. Returns
/// the number of items received once the input is closed and every task
/// has completed.
pub(crate) async fn for_each_spawned<I, F, Fut>(
    mut input: Inbox<I>,
    mut spawn_item: F,
) -> Result<usize, StageError>
where
    I: Send + 'static,
    F: FnMut(I) -> Fut,
    Fut: Future<Output = Result<(), StageError>> + Send + 'static,
{
    let mut tasks = JoinSet::new();
    let mut received = 0usize;

    loop {
        tokio::select! {
            Some(done) = tasks.join_next(), if !tasks.is_empty() => done??,
            item = input.recv() => match item? {
                Some(item) => {
                    received += 1;
                    tasks.spawn(spawn_item(item));
                }
                None => break,
            },
        }
    }

    while let Some(done) = tasks.join_next().await {
        done??;
    }
    Ok(received)
}
