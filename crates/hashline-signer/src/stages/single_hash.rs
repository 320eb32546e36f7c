//! Round 1: `checksum(n) + "~" + checksum(digest(n))` per input integer

use std::sync::Arc;

use hashline_core::{CancellationToken, PermitPool, Stage, StageContext, StageError};

use super::{for_each_spawned, run_blocking};
use crate::hash::HashPrimitives;

/// Round-1 signing stage.
///
/// Every digest call goes through the injected permit pool; hand the same
/// pool to every stage instance in a run to bound digests run-wide.
pub struct SingleHash<H> {
    hashes: Arc<H>,
    permits: PermitPool,
}

impl<H: HashPrimitives> SingleHash<H> {
    pub fn new(hashes: Arc<H>, permits: PermitPool) -> Self {
        Self { hashes, permits }
    }
}

/// Sign one integer.
///
/// The plain checksum and the digest branch run concurrently. The digest
/// permit is moved into the blocking call, so it is released as soon as
/// `digest` returns (or unwinds), before the outer checksum starts.
pub async fn single_hash<H: HashPrimitives>(
    n: i64,
    hashes: Arc<H>,
    permits: PermitPool,
    cancel: CancellationToken,
) -> Result<String, StageError> {
    let data = n.to_string();

    let plain = {
        let hashes = hashes.clone();
        let data = data.clone();
        run_blocking(move || hashes.checksum(&data))
    };

    let digested = async move {
        let permit = permits.acquire(&cancel).await?;
        let inner = hashes.clone();
        let digest = run_blocking(move || {
            let _permit = permit;
            inner.digest(&data)
        })
        .await?;
        run_blocking(move || hashes.checksum(&digest)).await
    };

    let (left, right) = tokio::try_join!(plain, digested)?;
    Ok(format!("{left}~{right}"))
}

impl<H: HashPrimitives> Stage<i64, String> for SingleHash<H> {
    fn name(&self) -> &'static str {
        "single_hash"
    }

    async fn run(self, ctx: StageContext<i64, String>) -> Result<(), StageError> {
        let StageContext {
            input,
            output,
            cancel,
        } = ctx;

        let received = for_each_spawned(input, |n| {
            let hashes = self.hashes.clone();
            let permits = self.permits.clone();
            let cancel = cancel.clone();
            let output = output.clone();
            async move {
                let joined = single_hash(n, hashes, permits, cancel).await?;
                log::trace!("single_hash({n}) = {joined}");
                output.send(joined).await
            }
        })
        .await?;

        log::debug!("single_hash: signed {received} items");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::StandardHashes;
    use crate::monitor::DigestMonitor;
    use hashline_core::Pipeline;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use crate::hash::DigestAlgorithm;
    use crate::stages::Feed;

    #[tokio::test]
    async fn signs_zero() {
        let out = single_hash(
            0,
            Arc::new(StandardHashes::default()),
            PermitPool::new(1),
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(out, "4108050209~2274490696");
    }

    #[tokio::test]
    async fn signs_zero_and_negative_with_md5() {
        let md5 = Arc::new(StandardHashes::new(DigestAlgorithm::Md5));
        let pool = PermitPool::new(1);
        let zero = single_hash(0, md5.clone(), pool.clone(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(zero, "4108050209~502633748");
        let negative = single_hash(-4, md5, pool, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(negative, "1078443173~1019264543");
    }

    /// Records how many digest permits are free whenever a digest output
    /// (64 hex chars) is being checksummed.
    struct PermitWatch {
        inner: StandardHashes,
        permits: PermitPool,
        free_during_outer: Mutex<Vec<usize>>,
    }

    impl HashPrimitives for PermitWatch {
        fn checksum(&self, data: &str) -> String {
            if data.len() == 64 {
                if let Ok(mut seen) = self.free_during_outer.lock() {
                    seen.push(self.permits.available());
                }
            }
            self.inner.checksum(data)
        }

        fn digest(&self, data: &str) -> String {
            self.inner.digest(data)
        }
    }

    #[tokio::test]
    async fn permit_released_before_outer_checksum() {
        let permits = PermitPool::new(1);
        let hashes = Arc::new(PermitWatch {
            inner: StandardHashes::default(),
            permits: permits.clone(),
            free_during_outer: Mutex::new(Vec::new()),
        });
        let out = single_hash(0, hashes.clone(), permits, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out, "4108050209~2274490696");
        assert_eq!(*hashes.free_during_outer.lock().unwrap(), vec![1]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn outer_checksums_overlap_across_items() {
        // Holding the permit through the outer checksum would serialize
        // 8 x (5ms + 80ms) = 680ms.
        let hashes = Arc::new(
            StandardHashes::default()
                .with_delays(Duration::from_millis(80), Duration::from_millis(5)),
        );
        let start = Instant::now();
        let run = Pipeline::new()
            .stage(Feed::new((0..8i64).collect()))
            .stage(SingleHash::new(hashes, PermitPool::new(1)))
            .run()
            .await
            .unwrap();
        let elapsed = start.elapsed();
        assert_eq!(run.items.len(), 8);
        assert!(elapsed < Duration::from_millis(400), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn matches_formula_for_each_item() {
        let hashes = Arc::new(StandardHashes::default());
        let run = Pipeline::new()
            .stage(Feed::new(vec![1i64, 2, 3]))
            .stage(SingleHash::new(hashes.clone(), PermitPool::new(1)))
            .run()
            .await
            .unwrap();

        let mut got = run.items;
        got.sort();
        let mut want: Vec<String> = [1i64, 2, 3]
            .iter()
            .map(|n| {
                let s = n.to_string();
                format!("{}~{}", hashes.checksum(&s), hashes.checksum(&hashes.digest(&s)))
            })
            .collect();
        want.sort();
        assert_eq!(got, want);
        assert!(got.contains(&"2212294583~923649842".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn one_digest_at_a_time() {
        let slow = StandardHashes::default()
            .with_delays(Duration::from_millis(5), Duration::from_millis(15));
        let monitor = DigestMonitor::new(slow);
        let run = Pipeline::new()
            .stage(Feed::new((0..12i64).collect()))
            .stage(SingleHash::new(Arc::new(monitor.clone()), PermitPool::new(1)))
            .run()
            .await
            .unwrap();

        assert_eq!(run.items.len(), 12);
        let stats = monitor.stats();
        assert_eq!(stats.calls, 12);
        assert_eq!(stats.peak_in_flight, 1);
        assert_eq!(stats.overlaps, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn wider_pool_allows_overlap() {
        // Sanity check for the monitor: without the single slot digests do overlap.
        let slow = StandardHashes::default().with_delays(Duration::ZERO, Duration::from_millis(50));
        let monitor = DigestMonitor::new(slow);
        Pipeline::new()
            .stage(Feed::new((0..8i64).collect()))
            .stage(SingleHash::new(Arc::new(monitor.clone()), PermitPool::new(8)))
            .wait()
            .await
            .unwrap();
        assert!(monitor.stats().peak_in_flight > 1);
    }
}
