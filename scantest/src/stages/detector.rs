//! Stage 2: forwards a cycle only when relevant files changed.

use anyhow::Result;
use tracing::{debug, info};

use crate::batch::{Batch, BatchWriter, Batches};
use crate::core::checksum::ChangeState;
use crate::core::types::FileDescription;
use crate::io::trigger::TriggerListener;

pub struct ChangeDetector {
    state: ChangeState,
    trigger: TriggerListener,
    input: Batches<FileDescription>,
    out: BatchWriter<FileDescription>,
}

impl ChangeDetector {
    pub fn new(
        trigger: TriggerListener,
        input: Batches<FileDescription>,
        out: BatchWriter<FileDescription>,
    ) -> Self {
        Self {
            state: ChangeState::new(),
            trigger,
            input,
            out,
        }
    }

    pub fn run(mut self) -> Result<()> {
        while let Some(batch) = self.input.next_batch() {
            self.process(batch)?;
        }
        Ok(())
    }

    /// Handle one scanned cycle. Returns whether it was forwarded.
    fn process(&mut self, batch: Batch<FileDescription>) -> Result<bool> {
        let reset = self.trigger.take();
        let Some(files) = self.state.observe(batch, reset) else {
            return Ok(false);
        };
        let modified = files.iter().filter(|file| file.is_modified).count();
        info!(files = files.len(), modified, reset, "running tests");
        self.out.send_all(files)?;
        debug!(tracked = self.state.tracked(), "cycle forwarded");
        Ok(true)
    }
}
