//! Stage 6: render each cycle's results.

use std::io::Write;

use anyhow::{Context, Result};

use crate::batch::Batches;
use crate::core::report::{render_console, render_json, sort_results};
use crate::core::types::TestResult;

/// Report format selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Console,
    Json,
}

pub struct Printer<W> {
    mode: OutputMode,
    input: Batches<TestResult>,
    writer: W,
}

impl<W: Write> Printer<W> {
    pub fn new(mode: OutputMode, input: Batches<TestResult>, writer: W) -> Self {
        Self {
            mode,
            input,
            writer,
        }
    }

    /// Print every cycle. A write or serialization failure is fatal.
    pub fn run(mut self) -> Result<()> {
        while let Some(batch) = self.input.next_batch() {
            let mut results: Vec<TestResult> = batch.collect();
            self.print(&mut results)?;
        }
        Ok(())
    }

    pub fn print(&mut self, results: &mut [TestResult]) -> Result<()> {
        sort_results(results);
        let report = match self.mode {
            OutputMode::Console => render_console(results),
            OutputMode::Json => {
                let mut line = render_json(results)?;
                line.push('\n');
                line
            }
        };
        self.writer
            .write_all(report.as_bytes())
            .context("write report")?;
        self.writer.flush().context("flush report")
    }
}
