//! Training progress observers.
//!
//! The trainer calls every registered observer at epoch boundaries and after
//! each adversarial iteration. Observers never influence training.

use indicatif::{ProgressBar, ProgressStyle};
use sentinel_core::LossRecord;
use std::time::Instant;
use tracing::{debug, info};

use crate::history::EpochSummary;

/// Losses of one adversarial iteration
#[derive(Debug, Clone)]
pub struct StepReport {
    /// 1-based epoch number
    pub epoch: usize,
    /// 0-based iteration within the epoch
    pub step: usize,
    /// Effective batch size of the iteration
    pub batch_size: usize,
    /// Average of the real and fake discriminator records
    pub discriminator: LossRecord,
    pub composite: LossRecord,
}

pub trait TrainingObserver {
    fn on_epoch_start(&mut self, _epoch: usize, _epochs: usize, _example_count: usize) {}

    fn on_step(&mut self, _report: &StepReport) {}

    fn on_epoch_end(&mut self, _summary: &EpochSummary) {}
}

/// Per-epoch progress bar advanced by the effective batch size
pub struct ProgressBarObserver {
    bar: ProgressBar,
    hidden: bool,
}

impl ProgressBarObserver {
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            hidden: false,
        }
    }

    /// Tracks progress without drawing
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            hidden: true,
        }
    }

    /// Examples processed in the current epoch
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Default for ProgressBarObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainingObserver for ProgressBarObserver {
    fn on_epoch_start(&mut self, epoch: usize, epochs: usize, example_count: usize) {
        self.bar = if self.hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(example_count as u64)
        };
        self.bar.set_length(example_count as u64);
        self.bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        self.bar.set_prefix(format!("Epoch {}/{}", epoch, epochs));
    }

    fn on_step(&mut self, report: &StepReport) {
        self.bar.inc(report.batch_size as u64);
        self.bar.set_message(format!(
            "d[{}] g[{}]",
            report.discriminator, report.composite
        ));
    }

    fn on_epoch_end(&mut self, _summary: &EpochSummary) {
        self.bar.finish();
    }
}

/// Logs epoch summaries, and every `log_every` steps at debug level
pub struct LoggingObserver {
    log_every: usize,
    epoch_started: Option<Instant>,
}

impl LoggingObserver {
    pub fn new(log_every: usize) -> Self {
        Self {
            log_every: log_every.max(1),
            epoch_started: None,
        }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new(10)
    }
}

impl TrainingObserver for LoggingObserver {
    fn on_epoch_start(&mut self, epoch: usize, epochs: usize, example_count: usize) {
        self.epoch_started = Some(Instant::now());
        info!("Epoch {}/{} started ({} examples)", epoch, epochs, example_count);
    }

    fn on_step(&mut self, report: &StepReport) {
        if report.step % self.log_every == 0 {
            debug!(
                "epoch {} step {} (batch {}): d[{}] g[{}]",
                report.epoch, report.step, report.batch_size, report.discriminator, report.composite
            );
        }
    }

    fn on_epoch_end(&mut self, summary: &EpochSummary) {
        let elapsed = self
            .epoch_started
            .take()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(summary.duration_secs);
        info!(
            "Epoch {} finished in {:.1}s: {} steps, d[{}] g[{}]",
            summary.epoch, elapsed, summary.steps, summary.discriminator, summary.composite
        );
    }
}
