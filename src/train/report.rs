//! Progress reporting hooks
//!
//! The trainer announces what it is doing through [`ProgressReporter`]. Every
//! hook has a default no-op implementation, so reporters only implement the
//! events they care about. [`ConsoleReporter`] prints the human-readable
//! progress lines to stdout.

use super::EpochMetrics;
use indicatif::{ProgressBar, ProgressStyle};

/// One periodic progress report from the training phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressLine {
    /// 0-based batch index
    pub iter: usize,
    pub total: usize,
    /// Loss of the most recent batch
    pub loss: f32,
    /// Throughput of the most recent batch, examples per second
    pub throughput: f64,
    pub lr: f32,
}

/// Hooks for training events
pub trait ProgressReporter {
    fn on_epoch_begin(&mut self, _epoch: usize, _max_epochs: usize) {}

    fn on_progress(&mut self, _line: &ProgressLine) {}

    /// Training phase finished; `epoch_secs` spans the whole phase
    fn on_train_end(&mut self, _epoch_secs: f64, _metrics: &EpochMetrics) {}

    fn on_validation_begin(&mut self, _total_batches: usize) {}

    fn on_validation_batch(&mut self) {}

    fn on_validation_end(&mut self, _metrics: &EpochMetrics) {}

    fn on_epoch_end(&mut self, _epoch: usize) {}

    fn on_early_stop(&mut self, _epoch: usize) {}
}

/// Reporter that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// Prints progress lines to stdout, with a progress bar during validation
#[derive(Default)]
pub struct ConsoleReporter {
    val_bar: Option<ProgressBar>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

pub(crate) fn format_progress(line: &ProgressLine) -> String {
    [
        format!("> iter=[{}/{}]", line.iter, line.total),
        format!("train_loss={:.3}", line.loss),
        format!("train_throughput={:.2} images/second", line.throughput),
        format!("lr={}", line.lr),
    ]
    .join(" | ")
}

pub(crate) fn format_train_summary(epoch_secs: f64, m: &EpochMetrics) -> String {
    format!(
        "> epoch_time={epoch_secs:.2}s | train_loss={:.3} | train_acc={:.3} | train_throughput={:.2} images/second",
        m.mean_loss, m.accuracy, m.mean_throughput
    )
}

pub(crate) fn format_val_summary(m: &EpochMetrics) -> String {
    format!(
        "> val_loss={:.3} | val_acc={:.3} | val_throughput={:.2} images/second",
        m.mean_loss, m.accuracy, m.mean_throughput
    )
}

const SEPARATOR: &str = "\n*******************\n";

impl ProgressReporter for ConsoleReporter {
    fn on_epoch_begin(&mut self, epoch: usize, max_epochs: usize) {
        println!("\n******** epoch {epoch}/{max_epochs} ********\n");
    }

    fn on_progress(&mut self, line: &ProgressLine) {
        println!("{}", format_progress(line));
    }

    fn on_train_end(&mut self, epoch_secs: f64, metrics: &EpochMetrics) {
        println!("{}", format_train_summary(epoch_secs, metrics));
    }

    fn on_validation_begin(&mut self, total_batches: usize) {
        println!("running validation...");
        let bar = ProgressBar::new(total_batches as u64);
        bar.set_style(
            ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        self.val_bar = Some(bar);
    }

    fn on_validation_batch(&mut self) {
        if let Some(bar) = &self.val_bar {
            bar.inc(1);
        }
    }

    fn on_validation_end(&mut self, metrics: &EpochMetrics) {
        if let Some(bar) = self.val_bar.take() {
            bar.finish_and_clear();
        }
        println!("{}", format_val_summary(metrics));
    }

    fn on_epoch_end(&mut self, _epoch: usize) {
        println!("{SEPARATOR}");
    }

    fn on_early_stop(&mut self, epoch: usize) {
        println!("{SEPARATOR}");
        println!("Early stopping at epoch {epoch}");
    }
}
