//! Stage 3: files to build units.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::batch::{BatchWriter, Batches};
use crate::core::grouping::group_units;
use crate::core::types::{BuildUnit, FileDescription};
use crate::io::toolchain::Toolchain;

pub struct UnitGrouper<T> {
    toolchain: Arc<T>,
    input: Batches<FileDescription>,
    out: BatchWriter<BuildUnit>,
}

impl<T: Toolchain> UnitGrouper<T> {
    pub fn new(
        toolchain: Arc<T>,
        input: Batches<FileDescription>,
        out: BatchWriter<BuildUnit>,
    ) -> Self {
        Self {
            toolchain,
            input,
            out,
        }
    }

    pub fn run(self) -> Result<()> {
        while let Some(batch) = self.input.next_batch() {
            let units = group_units(batch, |dir| self.toolchain.resolve_dir(dir));
            debug!(
                units = units.len(),
                modified = units.iter().filter(|unit| unit.is_modified()).count(),
                "grouped units"
            );
            self.out.send_all(units)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch;
    use crate::test_support::{ScriptedToolchain, modified, source_file, unit_info};
    use std::thread;

    #[test]
    fn every_cycle_becomes_one_batch_of_units() {
        let toolchain = ScriptedToolchain::new()
            .with_unit(unit_info("example.com/calc", &[], &[]))
            .with_unit(unit_info("example.com/app", &["example.com/calc"], &[]));
        let (files_tx, files_rx) = batch::channel();
        let (units_tx, units_rx) = batch::channel();
        let grouper = UnitGrouper::new(Arc::new(toolchain), files_rx, units_tx);
        let handle = thread::spawn(move || grouper.run());

        files_tx
            .send_all(vec![
                modified(source_file("/w/calc/calc.go", 1, 1)),
                source_file("/w/app/main.go", 1, 1),
                modified(source_file("/w/blank/blank.go", 0, 1)),
            ])
            .expect("send");
        let units: Vec<BuildUnit> = units_rx.next_batch().expect("units").collect();

        assert_eq!(units.len(), 2);
        assert_eq!(units[0].import_path(), "example.com/app");
        assert!(!units[0].is_modified());
        assert_eq!(units[1].import_path(), "example.com/calc");
        assert!(units[1].code_modified);

        drop(files_tx);
        handle.join().expect("join").expect("grouper");
    }
}
