//! Round 2: six labeled checksums per string, joined in label order

use std::sync::Arc;

use futures_util::future::try_join_all;
use hashline_core::{Stage, StageContext, StageError};

use super::{for_each_spawned, run_blocking};
use crate::hash::HashPrimitives;

/// Checksums computed per item; labels are `0..MULTI_HASH_ROUNDS`.
pub const MULTI_HASH_ROUNDS: usize = 6;

/// Round-2 signing stage.
pub struct MultiHash<H> {
    hashes: Arc<H>,
}

impl<H: HashPrimitives> MultiHash<H> {
    pub fn new(hashes: Arc<H>) -> Self {
        Self { hashes }
    }
}

/// `checksum("0" + s) + checksum("1" + s) + ... + checksum("5" + s)`.
///
/// All rounds run concurrently. `try_join_all` yields results in slot order
/// regardless of which round finishes first.
pub async fn multi_hash<H: HashPrimitives>(s: &str, hashes: &Arc<H>) -> Result<String, StageError> {
    let slots = (0..MULTI_HASH_ROUNDS).map(|k| {
        let hashes = hashes.clone();
        let data = format!("{k}{s}");
        run_blocking(move || hashes.checksum(&data))
    });
    let parts = try_join_all(slots).await?;
    Ok(parts.concat())
}

impl<H: HashPrimitives> Stage<String, String> for MultiHash<H> {
    fn name(&self) -> &'static str {
        "multi_hash"
    }

    async fn run(self, ctx: StageContext<String, String>) -> Result<(), StageError> {
        let StageContext { input, output, .. } = ctx;

        let received = for_each_spawned(input, |s| {
            let hashes = self.hashes.clone();
            let output = output.clone();
            async move {
                let joined = multi_hash(&s, &hashes).await?;
                log::trace!("multi_hash({s}) = {joined}");
                output.send(joined).await
            }
        })
        .await?;

        log::debug!("multi_hash: joined {received} items");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::StandardHashes;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use std::time::Duration;

    /// Checksum whose latency depends on the input, so rounds finish in
    /// a scrambled order.
    struct Jittery(StandardHashes);

    impl HashPrimitives for Jittery {
        fn checksum(&self, data: &str) -> String {
            let mut h = DefaultHasher::new();
            data.hash(&mut h);
            std::thread::sleep(Duration::from_millis(h.finish() % 25));
            self.0.checksum(data)
        }

        fn digest(&self, data: &str) -> String {
            self.0.digest(data)
        }
    }

    const ROUND1_ZERO: &str = "4108050209~2274490696";
    const ROUND2_ZERO: &str = "4132475435854440274071073899078901015911495221241474834";

    #[tokio::test]
    async fn joins_in_label_order() {
        let hashes = Arc::new(StandardHashes::default());
        let out = multi_hash(ROUND1_ZERO, &hashes).await.unwrap();
        assert_eq!(out, ROUND2_ZERO);

        let expected: String = (0..MULTI_HASH_ROUNDS)
            .map(|k| hashes.checksum(&format!("{k}{ROUND1_ZERO}")))
            .collect();
        assert_eq!(out, expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn order_survives_jitter() {
        let hashes = Arc::new(Jittery(StandardHashes::default()));
        for _ in 0..5 {
            assert_eq!(multi_hash(ROUND1_ZERO, &hashes).await.unwrap(), ROUND2_ZERO);
        }
    }

    #[tokio::test]
    async fn rounds_run_concurrently() {
        let slow = StandardHashes::default()
            .with_delays(Duration::from_millis(60), Duration::ZERO);
        let start = std::time::Instant::now();
        multi_hash("x", &Arc::new(slow)).await.unwrap();
        // Six sequential rounds would take 360ms
        assert!(start.elapsed() < Duration::from_millis(250), "{:?}", start.elapsed());
    }
}
