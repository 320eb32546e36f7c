//! Signing pipeline assembly and top-level execution

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use hashline_core::{
    PermitPool, Pipeline, PipelineConfig, PipelineError, PipelineRun, SharedProgress,
    StageError, StageReport, cancel_on_ctrl_c, counters_message,
};

use crate::config::Config;
use crate::hash::HashPrimitives;
use crate::monitor::DigestMonitor;
use crate::stages::{CombineResults, Feed, MultiHash, SingleHash};
use crate::stats::RunSummary;

/// Digests allowed in flight across one pipeline run
pub const DIGEST_PERMITS: usize = 1;

/// Progress line refresh interval (TTY only)
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Result of a successful signing run
#[derive(Debug)]
pub struct SignOutcome {
    pub combined: String,
    pub stages: Vec<StageReport>,
}

/// Start `Feed -> SingleHash -> MultiHash -> CombineResults`.
///
/// All stages are already running when this returns; drive the result with
/// [`Pipeline::run`]. Must be called inside a Tokio runtime.
pub fn signing_pipeline<H: HashPrimitives>(
    inputs: Vec<i64>,
    hashes: Arc<H>,
    config: PipelineConfig,
) -> Pipeline<String> {
    let permits = PermitPool::new(DIGEST_PERMITS);
    Pipeline::with_config(config)
        .stage(Feed::new(inputs))
        .stage(SingleHash::new(hashes.clone(), permits))
        .stage(MultiHash::new(hashes))
        .stage(CombineResults)
}

/// Sign `inputs` and return the combined result.
pub async fn sign<H: HashPrimitives>(
    inputs: Vec<i64>,
    hashes: Arc<H>,
    config: PipelineConfig,
) -> Result<SignOutcome, PipelineError> {
    let run = signing_pipeline(inputs, hashes, config).run().await?;
    into_outcome(run)
}

fn into_outcome(run: PipelineRun<String>) -> Result<SignOutcome, PipelineError> {
    let combined = run
        .items
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::Stage {
            stage: "combine",
            source: StageError::Failed("no combined result emitted".to_string()),
        })?;
    Ok(SignOutcome {
        combined,
        stages: run.stages,
    })
}

/// Main entry point for the sign command.
///
/// Builds a runtime, runs the pipeline with Ctrl-C cancellation and a live
/// progress line, and summarizes the run. A cancelled or failed run comes
/// back as an error wrapping [`PipelineError`].
pub fn run(config: &Config, inputs: Vec<i64>, progress: &SharedProgress) -> anyhow::Result<RunSummary> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads.max(1))
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    let monitor = DigestMonitor::new(config.hashes());
    let input_count = inputs.len();
    log::info!(
        "hashline starting: inputs={}, digest={}, workers={}",
        input_count,
        config.digest,
        config.worker_threads
    );

    let start = Instant::now();
    let result = runtime.block_on(async {
        let pipeline = signing_pipeline(inputs, Arc::new(monitor.clone()), config.pipeline_config());
        let shutdown = cancel_on_ctrl_c(pipeline.cancellation_token());

        let pb = progress.stage_line("sign");
        let ticker = progress.is_tty().then(|| {
            let counters = pipeline.counters();
            let pb = pb.clone();
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(TICK_INTERVAL);
                loop {
                    tick.tick().await;
                    pb.set_message(counters_message(&counters));
                }
            })
        });

        let result = pipeline.run().await;

        if let Some(ticker) = ticker {
            ticker.abort();
        }
        pb.finish_and_clear();
        shutdown.abort();
        result
    });

    let run = result.context("Signing pipeline failed")?;
    let outcome = into_outcome(run).context("Signing pipeline failed")?;
    let summary = RunSummary::new(outcome, input_count, monitor.stats(), start.elapsed());
    if summary.digest.overlaps > 0 {
        log::error!(
            "{} digest calls overlapped (peak {} in flight)",
            summary.digest.overlaps,
            summary.digest.peak_in_flight
        );
    }
    log::info!("hashline completed in {:.2}s", summary.elapsed.as_secs_f64());
    Ok(summary)
}
