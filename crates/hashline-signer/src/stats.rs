//! Run summary and reporting.
//!
//! TTY mode prints a table; non-TTY mode logs one line per fact so the
//! output stays greppable in CI logs.

use std::time::Duration;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use hashline_core::{ProgressContext, StageReport, fmt_num};

use crate::monitor::DigestStats;
use crate::runner::SignOutcome;
use crate::stages::SEPARATOR;

/// Everything worth reporting about one signing run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub combined: String,
    /// Integers fed into the pipeline
    pub inputs: usize,
    /// Segments in the combined result (one per input)
    pub segments: usize,
    pub stages: Vec<StageReport>,
    pub digest: DigestStats,
    /// Wall-clock time of the whole run
    pub elapsed: Duration,
}

/// Number of `_`-separated segments; the empty result has none.
pub fn count_segments(combined: &str) -> usize {
    if combined.is_empty() {
        0
    } else {
        combined.split(SEPARATOR).count()
    }
}

impl RunSummary {
    pub fn new(outcome: SignOutcome, inputs: usize, digest: DigestStats, elapsed: Duration) -> Self {
        Self {
            segments: count_segments(&outcome.combined),
            combined: outcome.combined,
            inputs,
            stages: outcome.stages,
            digest,
            elapsed,
        }
    }

    /// Format summary table as a string.
    pub fn format_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("Stage")
                    .fg(Color::Cyan)
                    .add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Items out").fg(Color::Cyan),
                Cell::new("Time").fg(Color::Cyan),
            ]);

        for stage in &self.stages {
            table.add_row(vec![
                Cell::new(stage.name),
                Cell::new(fmt_num(stage.items_out as usize)),
                Cell::new(format!("{:.2}s", stage.elapsed.as_secs_f64())),
            ]);
        }

        let digest_color = if self.digest.overlaps > 0 {
            Color::Red
        } else {
            Color::Green
        };
        table.add_row(vec![
            Cell::new("digest calls"),
            Cell::new(fmt_num(self.digest.calls)),
            Cell::new(format!("peak {} in flight", self.digest.peak_in_flight)).fg(digest_color),
        ]);
        table.add_row(vec![
            Cell::new("total")
                .fg(Color::Green)
                .add_attribute(comfy_table::Attribute::Bold),
            Cell::new(format!(
                "{} inputs → {} segments",
                fmt_num(self.inputs),
                fmt_num(self.segments)
            )),
            Cell::new(format!("{:.2}s", self.elapsed.as_secs_f64())),
        ]);

        table.to_string()
    }

    /// Print summary table above any live progress lines (TTY mode).
    pub fn print(&self, progress: &ProgressContext) {
        progress.println(format!("\n{}", self.format_table()));
    }

    /// Log summary (non-TTY mode).
    pub fn log(&self) {
        for stage in &self.stages {
            log::info!(
                "{}: {} items [{:.2}s]",
                stage.name,
                fmt_num(stage.items_out as usize),
                stage.elapsed.as_secs_f64()
            );
        }
        log::info!(
            "digest: {} calls, peak {} in flight, {} overlaps",
            fmt_num(self.digest.calls),
            self.digest.peak_in_flight,
            self.digest.overlaps
        );
        log::info!(
            "signed {} inputs into {} segments [{:.2}s]",
            fmt_num(self.inputs),
            fmt_num(self.segments),
            self.elapsed.as_secs_f64()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> RunSummary {
        RunSummary::new(
            SignOutcome {
                combined: "11_22_33".to_string(),
                stages: vec![StageReport {
                    name: "single_hash",
                    items_out: 3,
                    elapsed: Duration::from_millis(1500),
                }],
            },
            3,
            DigestStats {
                calls: 3,
                peak_in_flight: 1,
                overlaps: 0,
            },
            Duration::from_secs(2),
        )
    }

    #[test]
    fn segments_counted() {
        assert_eq!(count_segments(""), 0);
        assert_eq!(count_segments("abc"), 1);
        assert_eq!(count_segments("a_b_c"), 3);
        assert_eq!(summary().segments, 3);
    }

    #[test]
    fn table_lists_stages() {
        let table = summary().format_table();
        assert!(table.contains("single_hash"));
        assert!(table.contains("1.50s"));
        assert!(table.contains("peak 1 in flight"));
        assert!(table.contains("3 inputs → 3 segments"));
    }

    #[test]
    fn print_goes_through_progress_context() {
        summary().print(&ProgressContext::with_tty(false));
    }
}
