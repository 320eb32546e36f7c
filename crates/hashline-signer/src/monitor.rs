//! Digest concurrency monitor.
//!
//! Wraps any [`HashPrimitives`] and tracks how many `digest` calls are running
//! at once. More than one at a time means the permit discipline was broken:
//! the overlap is logged and counted rather than tolerated silently.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::hash::HashPrimitives;

/// Snapshot of digest call statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DigestStats {
    pub calls: usize,
    pub peak_in_flight: usize,
    /// Calls that started while another digest was still running
    pub overlaps: usize,
}

#[derive(Default)]
struct Counters {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    overlaps: AtomicUsize,
}

/// [`HashPrimitives`] wrapper recording digest concurrency.
///
/// Clones share counters, so a clone kept by the caller observes calls made
/// through the copy handed to the pipeline.
pub struct DigestMonitor<H> {
    inner: Arc<H>,
    counters: Arc<Counters>,
}

impl<H> Clone for DigestMonitor<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            counters: self.counters.clone(),
        }
    }
}

impl<H: HashPrimitives> DigestMonitor<H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner: Arc::new(inner),
            counters: Arc::default(),
        }
    }

    pub fn stats(&self) -> DigestStats {
        DigestStats {
            calls: self.counters.calls.load(Ordering::SeqCst),
            peak_in_flight: self.counters.peak.load(Ordering::SeqCst),
            overlaps: self.counters.overlaps.load(Ordering::SeqCst),
        }
    }
}

/// Decrements the in-flight count even if the wrapped digest panics.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<H: HashPrimitives> HashPrimitives for DigestMonitor<H> {
    fn checksum(&self, data: &str) -> String {
        self.inner.checksum(data)
    }

    fn digest(&self, data: &str) -> String {
        let c = &self.counters;
        c.calls.fetch_add(1, Ordering::SeqCst);
        let now = c.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&c.in_flight);
        c.peak.fetch_max(now, Ordering::SeqCst);
        if now > 1 {
            c.overlaps.fetch_add(1, Ordering::SeqCst);
            log::error!("digest overheat: {now} calls in flight");
        }
        self.inner.digest(data)
    }
}
