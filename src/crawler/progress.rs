//! Progress reporting for the fetch orchestrator
//!
//! Interactive mode redraws an `indicatif` bar on every completion. Batch
//! mode writes a plain log line at most once per interval, plus a final
//! line when the run ends, so CI logs stay readable.
//!
//! While a bar is on screen, log output has to go through it: the bar
//! redraws by moving the cursor up over its previous frame, which would
//! erase any line written underneath it. [`ProgressLogWriter`] is the
//! `tracing-subscriber` writer that hides the bar, writes the line, and
//! lets the bar redraw below it.

use crate::config::ProgressMode;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing_subscriber::fmt::MakeWriter;

/// The bar currently on screen, if any
static ACTIVE_BAR: BarSlot = BarSlot::new();

/// Holds the progress bar that log output must be written around
pub struct BarSlot {
    bar: RwLock<Option<ProgressBar>>,
}

impl BarSlot {
    pub const fn new() -> Self {
        Self {
            bar: RwLock::new(None),
        }
    }

    pub fn activate(&self, bar: &ProgressBar) {
        *self.bar.write().unwrap_or_else(PoisonError::into_inner) = Some(bar.clone());
    }

    pub fn deactivate(&self) {
        *self.bar.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn active(&self) -> Option<ProgressBar> {
        self.bar
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Writes `buf` to `out`, with the active bar (if any) cleared meanwhile
    fn write_around(&self, out: &mut dyn Write, buf: &[u8]) -> io::Result<()> {
        match self.active() {
            Some(bar) => bar.suspend(|| out.write_all(buf).and_then(|_| out.flush())),
            None => out.write_all(buf),
        }
    }
}

impl Default for BarSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// A single log write routed around the active bar
pub struct BarAwareWriter<'a, W: Write> {
    slot: &'a BarSlot,
    out: W,
}

impl<'a, W: Write> BarAwareWriter<'a, W> {
    pub fn new(slot: &'a BarSlot, out: W) -> Self {
        Self { slot, out }
    }
}

impl<W: Write> Write for BarAwareWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.slot.write_around(&mut self.out, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// `tracing-subscriber` writer for stderr that keeps log lines from being
/// overdrawn by the progress bar
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::crawler::ProgressLogWriter;
///
/// tracing_subscriber::fmt()
///     .with_writer(ProgressLogWriter)
///     .init();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressLogWriter;

impl<'a> MakeWriter<'a> for ProgressLogWriter {
    type Writer = BarAwareWriter<'static, io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        BarAwareWriter::new(&ACTIVE_BAR, io::stderr())
    }
}

/// Counters behind both progress modes
#[derive(Debug, Clone)]
pub struct ProgressState {
    pub total: u64,
    pub completed: u64,
    started_at: Instant,
    last_print: Instant,
}

impl ProgressState {
    pub fn new(total: u64, now: Instant) -> Self {
        Self {
            total,
            completed: 0,
            started_at: now,
            last_print: now,
        }
    }

    /// Formats a one-line progress meter
    pub fn format_meter(&self, now: Instant) -> String {
        let elapsed = now.saturating_duration_since(self.started_at);
        let secs = elapsed.as_secs_f64();
        let percent = if self.total == 0 {
            100
        } else {
            self.completed * 100 / self.total
        };
        let rate = if secs > 0.0 {
            self.completed as f64 / secs
        } else {
            0.0
        };

        format!(
            "{}/{} [{:>3}%] elapsed {:.1}s, {:.2} pages/s",
            self.completed, self.total, percent, secs, rate
        )
    }
}

/// Batch-mode throttle: decides when a progress line is due
#[derive(Debug, Clone)]
pub struct BatchProgress {
    state: ProgressState,
    interval: Duration,
}

impl BatchProgress {
    pub fn new(total: u64, interval: Duration, now: Instant) -> Self {
        Self {
            state: ProgressState::new(total, now),
            interval,
        }
    }

    /// Records a completion; returns the line to print if the interval has
    /// passed since the previous one
    pub fn complete_one(&mut self, now: Instant) -> Option<String> {
        self.state.completed += 1;

        if now.saturating_duration_since(self.state.last_print) < self.interval {
            return None;
        }

        self.state.last_print = now;
        Some(self.state.format_meter(now))
    }

    /// The final line, emitted regardless of the interval
    pub fn finish(&mut self, now: Instant) -> String {
        self.state.last_print = now;
        self.state.format_meter(now)
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }
}

/// Progress reporter in the configured mode
pub enum ProgressReporter {
    Interactive(ProgressBar),
    Batch(BatchProgress),
}

impl ProgressReporter {
    /// Creates a reporter for `total` tasks
    pub fn new(mode: ProgressMode, total: u64, interval: Duration) -> Self {
        match mode {
            ProgressMode::Interactive => {
                let bar = ProgressBar::new(total);
                let style = ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("##-");
                bar.set_style(style);
                ACTIVE_BAR.activate(&bar);
                ProgressReporter::Interactive(bar)
            }
            ProgressMode::Batch => {
                ProgressReporter::Batch(BatchProgress::new(total, interval, Instant::now()))
            }
        }
    }

    /// Records one finished task
    pub fn complete_one(&mut self) {
        match self {
            ProgressReporter::Interactive(bar) => bar.inc(1),
            ProgressReporter::Batch(batch) => {
                if let Some(line) = batch.complete_one(Instant::now()) {
                    tracing::info!("Progress: {}", line);
                }
            }
        }
    }

    /// Emits the final progress state
    pub fn finish(&mut self) {
        match self {
            ProgressReporter::Interactive(bar) => {
                bar.finish();
                ACTIVE_BAR.deactivate();
            }
            ProgressReporter::Batch(batch) => {
                tracing::info!("Progress: {}", batch.finish(Instant::now()));
            }
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let ProgressReporter::Interactive(_) = self {
            ACTIVE_BAR.deactivate();
        }
    }
}
