//! Hashline Signer - multi-round signing pipeline
//!
//! Feeds integers through two hashing rounds and an aggregation stage:
//!
//! ```text
//! Feed -> SingleHash -> MultiHash -> CombineResults
//!  i64     "crc~crc"     6 x crc      sorted, "_"-joined
//! ```
//!
//! SingleHash limits digest calls to one at a time across the whole run;
//! everything else runs concurrently per item.

pub mod config;
pub mod hash;
pub mod monitor;
pub mod runner;
pub mod stages;
pub mod stats;

// Re-exports
pub use config::Config;
pub use hash::{DigestAlgorithm, HashPrimitives, StandardHashes};
pub use monitor::{DigestMonitor, DigestStats};
pub use runner::{DIGEST_PERMITS, SignOutcome, run, sign, signing_pipeline};
pub use stages::{CombineResults, Feed, MultiHash, SingleHash};
pub use stats::RunSummary;
