//! Stage 5: generate, test and classify each selected unit.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::batch::{BatchWriter, Batches};
use crate::core::outcome::classify_test_exit;
use crate::core::types::{Status, TestResult};
use crate::io::config::GenerateCheck;
use crate::io::toolchain::Toolchain;

pub struct TestRunner<T> {
    toolchain: Arc<T>,
    check: GenerateCheck,
    input: Batches<String>,
    out: BatchWriter<TestResult>,
}

impl<T: Toolchain> TestRunner<T> {
    pub fn new(
        toolchain: Arc<T>,
        check: GenerateCheck,
        input: Batches<String>,
        out: BatchWriter<TestResult>,
    ) -> Self {
        Self {
            toolchain,
            check,
            input,
            out,
        }
    }

    pub fn run(self) -> Result<()> {
        while let Some(batch) = self.input.next_batch() {
            let units: Vec<String> = batch.collect();
            let start = Instant::now();
            let results: Vec<TestResult> = units.iter().map(|unit| self.run_unit(unit)).collect();
            info!(
                units = results.len(),
                failed = results
                    .iter()
                    .filter(|result| result.status < Status::TestsPassed)
                    .count(),
                duration_ms = start.elapsed().as_millis() as u64,
                "cycle finished"
            );
            self.out.send_all(results)?;
        }
        Ok(())
    }

    /// Generate, check the generate directive, then test one unit.
    #[instrument(skip(self))]
    pub fn run_unit(&self, unit: &str) -> TestResult {
        let generated = match self.toolchain.generate(unit) {
            Ok(invocation) if invocation.success() => invocation,
            Ok(invocation) => {
                warn!(reason = %invocation.failure_reason(), "generate failed");
                let output = format!("{}\n{}", invocation.output, invocation.failure_reason());
                return TestResult::new(unit, Status::GenerateFailed, output);
            }
            Err(err) => {
                warn!(err = %format!("{err:#}"), "generate could not run");
                return TestResult::new(unit, Status::GenerateFailed, format!("{err:#}"));
            }
        };

        if self.missing_directive(unit, &generated.output) {
            let marker = &self.check.marker;
            let output = format!(
                "{unit} imports {marker} but is missing a go generate directive to invoke the {marker} command (`//go:generate {marker}`)..."
            );
            return TestResult::new(unit, Status::GenerateFailed, output);
        }

        let tested = match self.toolchain.test(unit) {
            Ok(invocation) => invocation,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "test could not run");
                return TestResult::new(unit, Status::CompileFailed, format!("{err:#}"));
            }
        };
        let mut output = tested.output.clone();
        if tested.exit_code.is_none() {
            output.push('\n');
            output.push_str(&tested.failure_reason());
        }
        let result = classify_test_exit(unit, tested.exit_code, output);
        debug!(status = result.status.label(), failures = result.failures.len(), "unit finished");
        result
    }

    /// Test code imports the checked framework but the generator never ran it.
    fn missing_directive(&self, unit: &str, generate_output: &str) -> bool {
        let info = match self.toolchain.resolve_import(unit) {
            Ok(info) => info,
            Err(err) => {
                debug!(err = %format!("{err:#}"), "cannot inspect test imports");
                return false;
            }
        };
        info.test_imports.iter().any(|import| *import == self.check.import)
            && !generate_output.contains(&self.check.marker)
    }
}
