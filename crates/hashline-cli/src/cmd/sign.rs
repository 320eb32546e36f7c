//! `hashline sign` - run the signing pipeline over a list of integers

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use serde::Serialize;

use hashline_core::{PipelineError, SharedProgress};
use hashline_signer::RunSummary;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct SignArgs {
    /// Integers to sign (negative values allowed)
    #[arg(allow_negative_numbers = true)]
    pub values: Vec<i64>,

    /// Read integers from a file, one per line ("-" for stdin)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Digest algorithm
    #[arg(short, long, value_enum)]
    pub digest: Option<DigestArg>,

    /// Salt appended to every hashed value
    #[arg(long)]
    pub salt: Option<String>,

    /// Simulated latency per checksum call (ms)
    #[arg(long)]
    pub checksum_delay_ms: Option<u64>,

    /// Simulated latency per digest call (ms)
    #[arg(long)]
    pub digest_delay_ms: Option<u64>,

    /// Tokio worker threads
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy, ValueEnum, Debug)]
pub enum DigestArg {
    Sha256,
    Blake3,
    Md5,
}

impl From<DigestArg> for hashline_signer::DigestAlgorithm {
    fn from(d: DigestArg) -> Self {
        match d {
            DigestArg::Sha256 => hashline_signer::DigestAlgorithm::Sha256,
            DigestArg::Blake3 => hashline_signer::DigestAlgorithm::Blake3,
            DigestArg::Md5 => hashline_signer::DigestAlgorithm::Md5,
        }
    }
}

/// Machine-readable result for `--json`
#[derive(Serialize)]
struct JsonReport<'a> {
    result: &'a str,
    inputs: usize,
    segments: usize,
    elapsed_ms: u64,
    digest_calls: usize,
    digest_peak_in_flight: usize,
}

impl<'a> From<&'a RunSummary> for JsonReport<'a> {
    fn from(s: &'a RunSummary) -> Self {
        Self {
            result: &s.combined,
            inputs: s.inputs,
            segments: s.segments,
            elapsed_ms: s.elapsed.as_millis() as u64,
            digest_calls: s.digest.calls,
            digest_peak_in_flight: s.digest.peak_in_flight,
        }
    }
}

pub fn run(args: SignArgs, config: &Config, progress: &SharedProgress) -> Result<ExitCode> {
    let signer = signer_config(&args, config);

    let mut inputs = args.values.clone();
    if let Some(path) = &args.input {
        inputs.extend(read_input_source(path)?);
    }
    if inputs.is_empty() {
        log::warn!("No inputs given; the combined result will be empty");
    }

    let summary = match hashline_signer::run(&signer, inputs, progress) {
        Ok(summary) => summary,
        Err(e) => {
            if e
                .downcast_ref::<PipelineError>()
                .is_some_and(PipelineError::is_cancelled)
            {
                log::warn!("Signing cancelled");
                return Ok(ExitCode::from(130));
            }
            log::error!("{e:#}");
            return Ok(ExitCode::from(1));
        }
    };

    if progress.is_tty() {
        summary.print(progress);
    } else {
        summary.log();
    }

    if args.json {
        let json = serde_json::to_string_pretty(&JsonReport::from(&summary))
            .context("Failed to serialize result")?;
        println!("{json}");
    } else {
        println!("{}", summary.combined);
    }
    Ok(ExitCode::SUCCESS)
}

/// File config with CLI flags layered on top
fn signer_config(args: &SignArgs, config: &Config) -> hashline_signer::Config {
    let mut signer = config.signer();
    if let Some(d) = args.digest {
        signer.digest = d.into();
    }
    if let Some(salt) = &args.salt {
        signer.salt = salt.clone();
    }
    if let Some(ms) = args.checksum_delay_ms {
        signer.checksum_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = args.digest_delay_ms {
        signer.digest_delay = Duration::from_millis(ms);
    }
    if let Some(w) = args.workers {
        signer.worker_threads = w.max(1);
    }
    signer
}

fn read_input_source(path: &Path) -> Result<Vec<i64>> {
    if path == Path::new("-") {
        return parse_inputs(std::io::stdin().lock(), "<stdin>");
    }
    let file = std::fs::File::open(path)
        .with_context(|| format!("Cannot open input file: {}", path.display()))?;
    parse_inputs(BufReader::new(file), &path.display().to_string())
}

/// One signed integer per line; blank lines and `#` comments are skipped.
fn parse_inputs(reader: impl BufRead, source: &str) -> Result<Vec<i64>> {
    let mut values = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("{source}: read error"))?;
        let text = line.split('#').next().unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }
        match text.parse::<i64>() {
            Ok(v) => values.push(v),
            Err(e) => bail!("{source}:{}: invalid integer {text:?}: {e}", idx + 1),
        }
    }
    log::debug!("Read {} inputs from {source}", values.len());
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: SignArgs,
    }

    #[test]
    fn parse_inputs_skips_comments_and_blanks() {
        let text = "0\n\n# fibonacci\n1\n1 # again\n  2  \n";
        let values = parse_inputs(text.as_bytes(), "test").unwrap();
        assert_eq!(values, vec![0, 1, 1, 2]);
    }

    #[test]
    fn parse_inputs_accepts_negative() {
        let values = parse_inputs("1\n-4\n".as_bytes(), "nums.txt").unwrap();
        assert_eq!(values, vec![1, -4]);
    }

    #[test]
    fn parse_inputs_reports_line() {
        let err = parse_inputs("1\nfour\n".as_bytes(), "nums.txt").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.starts_with("nums.txt:2:"), "{msg}");
    }

    #[test]
    fn negative_positional_values() {
        let cli = TestCli::parse_from(["sign", "--digest", "md5", "-4", "3"]);
        assert_eq!(cli.args.values, vec![-4, 3]);
        let signer = signer_config(&cli.args, &Config::default());
        assert_eq!(signer.digest, hashline_signer::DigestAlgorithm::Md5);
    }

    #[test]
    fn signs_negative_input() {
        let progress = std::sync::Arc::new(hashline_core::ProgressContext::with_tty(false));
        let cli = TestCli::parse_from(["sign", "--digest", "md5", "-4"]);
        let signer = signer_config(&cli.args, &Config::default());
        let summary = hashline_signer::run(&signer, cli.args.values, &progress).unwrap();
        assert_eq!(
            summary.combined,
            "418831487740022159973623114109323565612527685724132989321021"
        );
    }

    #[test]
    fn flags_override_file() {
        let cli = TestCli::parse_from([
            "sign",
            "--digest",
            "blake3",
            "--salt",
            "x",
            "--digest-delay-ms",
            "10",
            "1",
            "2",
        ]);
        assert_eq!(cli.args.values, vec![1, 2]);

        let signer = signer_config(&cli.args, &Config::default());
        assert_eq!(signer.digest, hashline_signer::DigestAlgorithm::Blake3);
        assert_eq!(signer.salt, "x");
        assert_eq!(signer.digest_delay, Duration::from_millis(10));
        assert_eq!(signer.checksum_delay, Duration::ZERO);
    }

    #[test]
    fn json_report_fields() {
        let summary = RunSummary {
            combined: "a_b".to_string(),
            inputs: 2,
            segments: 2,
            stages: Vec::new(),
            digest: hashline_signer::DigestStats {
                calls: 2,
                peak_in_flight: 1,
                overlaps: 0,
            },
            elapsed: Duration::from_millis(42),
        };
        let json = serde_json::to_value(JsonReport::from(&summary)).unwrap();
        assert_eq!(json["result"], "a_b");
        assert_eq!(json["segments"], 2);
        assert_eq!(json["elapsed_ms"], 42);
        assert_eq!(json["digest_peak_in_flight"], 1);
    }
}
