//! Signer run configuration

use std::time::Duration;

use hashline_core::PipelineConfig;
use hashline_core::stream::DEFAULT_CAPACITY;

use crate::hash::{DigestAlgorithm, StandardHashes};

/// Everything a signing run needs besides its inputs
#[derive(Debug, Clone)]
pub struct Config {
    pub digest: DigestAlgorithm,
    pub salt: String,
    /// Simulated latency per checksum call
    pub checksum_delay: Duration,
    /// Simulated latency per digest call
    pub digest_delay: Duration,
    /// Tokio worker threads
    pub worker_threads: usize,
    /// Buffered items per stream hop
    pub channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            digest: DigestAlgorithm::default(),
            salt: String::new(),
            checksum_delay: Duration::ZERO,
            digest_delay: Duration::ZERO,
            worker_threads: cpus.min(8),
            channel_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Config {
    /// Primitives described by this config.
    pub fn hashes(&self) -> StandardHashes {
        StandardHashes::new(self.digest)
            .with_salt(self.salt.clone())
            .with_delays(self.checksum_delay, self.digest_delay)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            capacity: self.channel_capacity.max(1),
        }
    }
}
