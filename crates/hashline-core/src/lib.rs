//! Hashline Core - typed staged pipeline engine
//!
//! Stages are stream transducers wired into a chain of bounded channels and
//! run concurrently on Tokio. This crate holds the engine and the plumbing
//! shared by concrete pipelines: streams, permit pools, errors, logging,
//! progress and shutdown.

pub mod error;
pub mod logging;
pub mod permit;
pub mod pipeline;
pub mod progress;
pub mod shutdown;
pub mod stage;
pub mod stream;

// Re-exports for convenience
pub use error::{PipelineError, StageError};
pub use logging::{IndicatifLogger, Verbosity, init_logging};
pub use permit::{Permit, PermitPool};
pub use pipeline::{Pipeline, PipelineConfig, PipelineRun, StageReport};
pub use progress::{ProgressContext, SharedProgress, counters_message, fmt_num};
pub use shutdown::cancel_on_ctrl_c;
pub use stage::{Stage, StageContext};
pub use stream::{Inbox, ItemCounter, Outbox};
pub use tokio_util::sync::CancellationToken;
