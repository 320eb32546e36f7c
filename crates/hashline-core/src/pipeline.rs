//! Pipeline engine: wires typed stages into a chain of streams.
//!
//! ```text
//! Pipeline::new()          placeholder head (empty, closed)
//!   .stage(a)  ()  -> A    spawned immediately
//!   .stage(b)  A   -> B    spawned immediately
//!   .run()                 drain tail until closed, join all stages
//! ```
//!
//! Every stage is running before the caller can observe output. The first
//! stage failure cancels the run token, which unblocks every other stage, and
//! is reported once as the run's [`PipelineError`].

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{PipelineError, StageError};
use crate::stage::{Stage, StageContext};
use crate::stream::{self, DEFAULT_CAPACITY, Inbox, ItemCounter};

/// Engine settings
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Buffered items per stream hop
    pub capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Per-stage outcome of a finished run
#[derive(Debug, Clone)]
pub struct StageReport {
    pub name: &'static str,
    /// Items the stage sent downstream
    pub items_out: u64,
    /// Time from stage start until its run future completed
    pub elapsed: Duration,
}

/// Result of a successful run: the drained tail plus stage reports in chain order
#[derive(Debug)]
pub struct PipelineRun<T> {
    pub items: Vec<T>,
    pub stages: Vec<StageReport>,
}

struct RunningStage {
    name: &'static str,
    counter: ItemCounter,
    handle: JoinHandle<(Result<(), StageError>, Duration)>,
}

/// A chain of running stages whose final stream carries `T`.
///
/// Must be built inside a Tokio runtime: [`stage`](Pipeline::stage) spawns.
pub struct Pipeline<T> {
    config: PipelineConfig,
    cancel: CancellationToken,
    tail: Inbox<T>,
    stages: Vec<RunningStage>,
}

impl Pipeline<()> {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        let cancel = CancellationToken::new();
        Self {
            config,
            tail: Inbox::closed(&cancel),
            cancel,
            stages: Vec::new(),
        }
    }
}

impl Default for Pipeline<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Pipeline<T> {
    /// Start `stage` against the current tail; its output becomes the new tail.
    pub fn stage<O, S>(self, stage: S) -> Pipeline<O>
    where
        O: Send + 'static,
        S: Stage<T, O>,
    {
        let Self {
            config,
            cancel,
            tail,
            mut stages,
        } = self;

        let name = stage.name();
        let (output, next) = stream::channel(config.capacity, &cancel);
        let counter = output.counter();
        let ctx = StageContext {
            input: tail,
            output,
            cancel: cancel.clone(),
        };

        let stage_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let start = Instant::now();
            log::debug!("{name}: started");
            let result = stage.run(ctx).await;
            let elapsed = start.elapsed();
            match &result {
                Ok(()) => log::debug!("{name}: finished in {:.3}s", elapsed.as_secs_f64()),
                Err(e) if e.is_secondary() => log::debug!("{name}: stopped: {e}"),
                Err(e) => {
                    log::error!("{name}: failed: {e}");
                    stage_cancel.cancel();
                }
            }
            (result, elapsed)
        });

        stages.push(RunningStage {
            name,
            counter,
            handle,
        });

        Pipeline {
            config,
            cancel,
            tail: next,
            stages,
        }
    }

    /// Token that aborts the whole run when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Live sent-item counters, one per stage in chain order.
    pub fn counters(&self) -> Vec<(&'static str, ItemCounter)> {
        self.stages
            .iter()
            .map(|s| (s.name, s.counter.clone()))
            .collect()
    }

    /// Drain the final stream until it closes, then join every stage.
    pub async fn run(self) -> Result<PipelineRun<T>, PipelineError> {
        let Self {
            cancel,
            tail,
            stages,
            ..
        } = self;

        // A cancelled drain is not the root cause; the joins below find it.
        let collected = tail.collect().await;
        let stages = join_stages(stages, &cancel).await?;
        let items = collected.map_err(|_| PipelineError::Cancelled)?;
        Ok(PipelineRun { items, stages })
    }

    /// Drain and discard the final stream; returns once every stage completed.
    pub async fn wait(self) -> Result<Vec<StageReport>, PipelineError> {
        let Self {
            cancel,
            tail,
            stages,
            ..
        } = self;

        let drained = tail.drain().await.unwrap_or_default();
        log::debug!("pipeline drained {drained} items");
        join_stages(stages, &cancel).await
    }
}

/// Join all stages and pick the root-cause error, if any.
///
/// Primary errors win over secondary ones; among equals the earliest stage
/// in the chain wins.
async fn join_stages(
    stages: Vec<RunningStage>,
    cancel: &CancellationToken,
) -> Result<Vec<StageReport>, PipelineError> {
    let mut reports = Vec::with_capacity(stages.len());
    let mut primary: Option<(&'static str, StageError)> = None;
    let mut secondary: Option<(&'static str, StageError)> = None;

    for stage in stages {
        let (result, elapsed) = match stage.handle.await {
            Ok(out) => out,
            Err(join_err) => {
                // The stage task itself panicked; make sure nothing keeps waiting.
                cancel.cancel();
                (Err(StageError::from(join_err)), Duration::ZERO)
            }
        };
        match result {
            Ok(()) => {}
            Err(e) if e.is_secondary() => {
                secondary.get_or_insert((stage.name, e));
            }
            Err(e) => {
                if primary.is_none() {
                    primary = Some((stage.name, e));
                } else {
                    log::debug!("{}: additional failure: {e}", stage.name);
                }
            }
        }
        reports.push(StageReport {
            name: stage.name,
            items_out: stage.counter.load(std::sync::atomic::Ordering::Relaxed),
            elapsed,
        });
    }

    if let Some((stage, source)) = primary {
        return Err(PipelineError::Stage { stage, source });
    }
    if let Some((stage, source)) = secondary {
        // Only secondary errors: someone outside the chain cancelled the run,
        // or a stage dropped its input early.
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        return Err(PipelineError::Stage { stage, source });
    }
    // Every stage completed; a cancel that arrived afterwards changes nothing.
    Ok(reports)
}
