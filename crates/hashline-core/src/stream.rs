//! Typed, closeable streams connecting pipeline stages.
//!
//! A stream is a bounded tokio mpsc channel split into an [`Outbox`] (cloneable,
//! one per producer) and an [`Inbox`] (single consumer). The stream closes when
//! every `Outbox` clone has been dropped. Both ends observe the run's
//! [`CancellationToken`], so a blocked send or receive returns
//! [`StageError::Cancelled`] once the run is aborted.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::StageError;

/// Default number of items buffered per stream hop
pub const DEFAULT_CAPACITY: usize = 64;

/// Shared count of items sent through a stream, for progress tracking
pub type ItemCounter = Arc<AtomicU64>;

/// Create a stream with `capacity` buffered items bound to `cancel`.
pub fn channel<T>(capacity: usize, cancel: &CancellationToken) -> (Outbox<T>, Inbox<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let outbox = Outbox {
        tx,
        cancel: cancel.clone(),
        sent: Arc::new(AtomicU64::new(0)),
    };
    let inbox = Inbox {
        rx,
        cancel: cancel.clone(),
    };
    (outbox, inbox)
}

/// Producer end of a stream.
///
/// Clone it to hand one to each per-item sub-task (fan-in); all clones share
/// one item counter.
pub struct Outbox<T> {
    tx: mpsc::Sender<T>,
    cancel: CancellationToken,
    sent: ItemCounter,
}

impl<T> Clone for Outbox<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            cancel: self.cancel.clone(),
            sent: self.sent.clone(),
        }
    }
}

impl<T> Outbox<T> {
    /// Send one item, waiting while the stream is full.
    pub async fn send(&self, item: T) -> Result<(), StageError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StageError::Cancelled),
            sent = self.tx.send(item) => {
                sent.map_err(|_| StageError::Disconnected)?;
                self.sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        }
    }

    /// Items sent so far through this stream (all clones).
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Shared handle to the sent-items counter.
    pub fn counter(&self) -> ItemCounter {
        self.sent.clone()
    }
}

/// Consumer end of a stream.
pub struct Inbox<T> {
    rx: mpsc::Receiver<T>,
    cancel: CancellationToken,
}

impl<T> Inbox<T> {
    /// An empty stream that is already closed.
    pub fn closed(cancel: &CancellationToken) -> Self {
        let (_, inbox) = channel(1, cancel);
        inbox
    }

    /// Receive the next item. `Ok(None)` means every producer is gone.
    ///
    /// Buffered items and closure are returned even after cancellation;
    /// only a receive that would wait fails with [`StageError::Cancelled`].
    pub async fn recv(&mut self) -> Result<Option<T>, StageError> {
        tokio::select! {
            biased;
            item = self.rx.recv() => Ok(item),
            _ = self.cancel.cancelled() => Err(StageError::Cancelled),
        }
    }

    /// Receive everything until the stream closes.
    pub async fn collect(mut self) -> Result<Vec<T>, StageError> {
        let mut items = Vec::new();
        while let Some(item) = self.recv().await? {
            items.push(item);
        }
        Ok(items)
    }

    /// Receive and discard everything until the stream closes.
    pub async fn drain(mut self) -> Result<u64, StageError> {
        let mut n = 0;
        while self.recv().await?.is_some() {
            n += 1;
        }
        Ok(n)
    }
}
