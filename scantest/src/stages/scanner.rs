//! Stage 1: repeated walks of the working tree.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::trace;

use crate::batch::BatchWriter;
use crate::core::types::FileDescription;
use crate::io::walk::{WalkFilter, walk};

pub struct Scanner {
    root: PathBuf,
    filter: WalkFilter,
    interval: Duration,
    out: BatchWriter<FileDescription>,
}

impl Scanner {
    pub fn new(
        root: impl Into<PathBuf>,
        filter: WalkFilter,
        interval: Duration,
        out: BatchWriter<FileDescription>,
    ) -> Self {
        Self {
            root: root.into(),
            filter,
            interval,
            out,
        }
    }

    /// Emit one batch describing every entry under the root.
    pub fn scan_once(&self) -> Result<usize> {
        let sink = self.out.begin()?;
        let mut emitted = 0;
        for file in walk(&self.root, &self.filter) {
            sink.push(file)?;
            emitted += 1;
        }
        sink.finish();
        trace!(emitted, "scan complete");
        Ok(emitted)
    }

    pub fn run(self) -> Result<()> {
        loop {
            self.scan_once()?;
            thread::sleep(self.interval);
        }
    }
}
