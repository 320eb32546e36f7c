//! Stage trait: the unit of pipeline work

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::StageError;
use crate::stream::{Inbox, Outbox};

/// Handles a stage receives when the engine starts it.
pub struct StageContext<I, O> {
    pub input: Inbox<I>,
    pub output: Outbox<O>,
    /// Run-wide cancellation; fires on the first stage failure.
    pub cancel: CancellationToken,
}

/// A stream transducer from `I` items to `O` items.
///
/// The engine calls [`run`](Stage::run) exactly once (it consumes the stage).
/// The output stream closes once the returned future completes and every
/// clone of `output` handed to sub-tasks has been dropped, so a stage must
/// not return before its in-flight per-item work is done.
pub trait Stage<I, O>: Send + 'static
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Short identifier used in logs and error reports.
    fn name(&self) -> &'static str;

    fn run(self, ctx: StageContext<I, O>) -> impl Future<Output = Result<(), StageError>> + Send;
}
