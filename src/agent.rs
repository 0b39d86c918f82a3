//! A minimal host for outputs.
//!
//! The agent reads newline delimited JSON metrics, buffers them and flushes
//! every `flush_batch_size` metrics, and once more at end of input, to each
//! of its outputs in turn. A failed write is logged and that flush is
//! dropped for the failing output; the agent does not retry.

use metric::Metric;
use serde_json;
use sink::{self, BoxedOutput};
use std::io;
use std::io::BufRead;

/// What happened during `Agent::run`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Report {
    /// Metrics decoded from the input
    pub received: usize,
    /// Non-blank input lines that did not decode
    pub malformed: usize,
    /// Flushes performed
    pub flushes: usize,
    /// Output writes that returned an error
    pub failed_writes: usize,
}

struct RunningOutput {
    name: String,
    output: BoxedOutput,
}

/// Drives a set of outputs.
pub struct Agent {
    outputs: Vec<RunningOutput>,
    flush_batch_size: usize,
    buffer: Vec<Metric>,
}

impl Agent {
    /// Create an agent with no outputs. A `flush_batch_size` of zero is
    /// treated as one.
    pub fn new(flush_batch_size: usize) -> Agent {
        let flush_batch_size = if flush_batch_size == 0 {
            1
        } else {
            flush_batch_size
        };
        Agent {
            outputs: Vec::new(),
            flush_batch_size: flush_batch_size,
            buffer: Vec::with_capacity(flush_batch_size),
        }
    }

    /// Add an output under `name`, which is only used in log lines.
    pub fn add_output<S>(&mut self, name: S, output: BoxedOutput)
    where
        S: Into<String>,
    {
        self.outputs.push(RunningOutput {
            name: name.into(),
            output: output,
        });
    }

    /// Does the agent have no outputs?
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Connect every output, stopping at the first failure.
    pub fn connect(&mut self) -> Result<(), sink::Error> {
        for ro in &mut self.outputs {
            info!("connecting output {}", ro.name);
            if let Err(e) = ro.output.connect() {
                error!("failed to connect output {}: {}", ro.name, e);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Read metrics from `input` until it is exhausted.
    ///
    /// Lines that are not a JSON metric, including lines that are not UTF-8,
    /// are logged and skipped. A read error ends the run after flushing what
    /// was already buffered.
    pub fn run<R>(&mut self, mut input: R) -> io::Result<Report>
    where
        R: BufRead,
    {
        let mut report = Report::default();
        let mut line = Vec::new();
        let mut lineno = 0;
        loop {
            line.clear();
            match input.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => lineno += 1,
                Err(e) => {
                    error!("failed reading input after line {}: {}", lineno, e);
                    if !self.buffer.is_empty() {
                        self.flush(&mut report);
                    }
                    return Err(e);
                }
            }
            if line.iter().all(|b| b.is_ascii_whitespace()) {
                continue;
            }
            match serde_json::from_slice::<Metric>(&line) {
                Ok(metric) => {
                    report.received += 1;
                    self.buffer.push(metric);
                    if self.buffer.len() >= self.flush_batch_size {
                        self.flush(&mut report);
                    }
                }
                Err(e) => {
                    warn!("skipping line {}: {}", lineno, e);
                    report.malformed += 1;
                }
            }
        }
        if !self.buffer.is_empty() {
            self.flush(&mut report);
        }
        Ok(report)
    }

    fn flush(&mut self, report: &mut Report) {
        report.flushes += 1;
        debug!("flushing {} metrics", self.buffer.len());
        for ro in &mut self.outputs {
            if let Err(e) = ro.output.write(&self.buffer) {
                error!(
                    "output {} failed to write {} metrics, dropping them: {}",
                    ro.name,
                    self.buffer.len(),
                    e
                );
                report.failed_writes += 1;
            }
        }
        self.buffer.clear();
    }

    /// Close every output.
    pub fn close(&mut self) {
        for ro in &mut self.outputs {
            if let Err(e) = ro.output.close() {
                warn!("failed to close output {}: {}", ro.name, e);
            }
        }
    }
}
