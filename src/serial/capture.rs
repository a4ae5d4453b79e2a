//! Timed capture loop
//!
//! Polls a line source for a fixed wall-clock duration and hands every
//! non-blank decoded line to the console reporter:
//! - Bounded by an injectable clock, so tests run in virtual time
//! - Stops early when the shared running flag is cleared (Ctrl+C)
//! - Closes the source exactly once, whatever happened in the loop

use crate::error::{CaptureError, Result};
use crate::report::{CapturedLine, Reporter};
use crate::serial::decode::{decode_line, DecodePolicy};
use crate::serial::port::PortConfig;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Anything that can hand out newline-terminated chunks of bytes
pub trait LineSource {
    /// Count of received bytes not yet consumed
    fn bytes_to_read(&mut self) -> Result<usize>;

    /// Read one chunk ending in `\n`, or whatever arrived before `timeout`.
    /// `Ok(None)` means no data.
    fn read_line(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>>;

    /// Release the underlying device
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Source of time for the capture loop
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Real monotonic clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Timing and decoding parameters for one capture session
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Total capture time
    pub duration: Duration,
    /// Pause between checks for available data
    pub poll_interval: Duration,
    /// Upper bound for a single line read
    pub read_timeout: Duration,
    pub decode: DecodePolicy,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(120),
            poll_interval: Duration::from_millis(10),
            read_timeout: Duration::from_secs(1),
            decode: DecodePolicy::Drop,
        }
    }
}

/// Counters reported in the completion banner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureSummary {
    /// Lines printed
    pub lines: usize,
    /// Raw bytes consumed from the source
    pub bytes: usize,
    /// Reads that decoded to nothing but whitespace
    pub blank_reads: usize,
    /// Non-timeout read failures
    pub read_errors: usize,
    /// Set when the running flag was cleared before the duration expired
    pub interrupted: bool,
    pub elapsed: Duration,
}

/// Capture session bound to a clock and a running flag
pub struct SerialCapture<C: Clock> {
    config: CaptureConfig,
    clock: C,
    running: Arc<AtomicBool>,
    summary: CaptureSummary,
}

impl<C: Clock> SerialCapture<C> {
    pub fn new(config: CaptureConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            running: Arc::new(AtomicBool::new(true)),
            summary: CaptureSummary::default(),
        }
    }

    /// Get a clone of the running flag for signal handling
    pub fn get_running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Poll `source` until the duration expires, then close it.
    ///
    /// The source is closed even when writing to the reporter fails; the
    /// reporter error is returned after the close.
    pub fn run<S, W>(&mut self, mut source: S, reporter: &mut Reporter<W>) -> Result<CaptureSummary>
    where
        S: LineSource,
        W: Write,
    {
        log::info!(
            "Capturing for {:?} (poll every {:?}, decode policy: {})",
            self.config.duration,
            self.config.poll_interval,
            self.config.decode
        );

        let outcome = self.poll(&mut source, reporter);
        let closed = source.close();

        outcome?;
        closed?;

        log::debug!(
            "Capture done: {} lines, {} bytes, {} read errors",
            self.summary.lines,
            self.summary.bytes,
            self.summary.read_errors
        );
        Ok(self.summary)
    }

    fn poll<S, W>(&mut self, source: &mut S, reporter: &mut Reporter<W>) -> Result<()>
    where
        S: LineSource,
        W: Write,
    {
        let start = self.clock.now();
        self.summary = CaptureSummary::default();

        loop {
            let elapsed = self.clock.now().saturating_duration_since(start);
            if elapsed >= self.config.duration {
                break;
            }
            if !self.running.load(Ordering::SeqCst) {
                log::info!("Capture stopped after {:.1}s", elapsed.as_secs_f64());
                self.summary.interrupted = true;
                break;
            }

            let remaining = self.config.duration - elapsed;
            match source.bytes_to_read() {
                Ok(0) => {}
                Ok(_) => match source.read_line(self.config.read_timeout.min(remaining)) {
                    Ok(Some(raw)) => self.process_chunk(&raw, reporter)?,
                    Ok(None) => {}
                    Err(e) => self.record_read_error(&e),
                },
                Err(e) => self.record_read_error(&e),
            }

            let elapsed = self.clock.now().saturating_duration_since(start);
            let remaining = self.config.duration.saturating_sub(elapsed);
            self.clock.sleep(self.config.poll_interval.min(remaining));
        }

        self.summary.elapsed = self.clock.now().saturating_duration_since(start);
        Ok(())
    }

    fn process_chunk<W: Write>(&mut self, raw: &[u8], reporter: &mut Reporter<W>) -> Result<()> {
        self.summary.bytes += raw.len();

        match decode_line(raw, self.config.decode) {
            Some(text) => {
                let line = CapturedLine::new(text, raw.len());
                log::trace!("{} raw bytes -> {:?}", line.raw_len, line.text);
                self.summary.lines += 1;
                reporter.captured(&line)?;
            }
            None => self.summary.blank_reads += 1,
        }

        Ok(())
    }

    fn record_read_error(&mut self, error: &CaptureError) {
        self.summary.read_errors += 1;
        log::warn!("Read error: {}", error);
    }
}

/// Full operator-facing session: startup banners, the capture itself, then
/// the completion banner once `source` has been closed.
pub fn run_session<C, S, W>(
    capture: &mut SerialCapture<C>,
    source: S,
    port: &PortConfig,
    prompt: &str,
    reporter: &mut Reporter<W>,
) -> Result<CaptureSummary>
where
    C: Clock,
    S: LineSource,
    W: Write,
{
    reporter.connected(port)?;
    reporter.instructions(prompt)?;
    reporter.separator()?;

    let summary = capture.run(source, reporter)?;
    reporter.finished(&summary)?;

    Ok(summary)
}
