//! Stage 4: reverse-dependency cascade over one cycle's units.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::batch::{BatchWriter, Batches};
use crate::core::cascade::{CascadeMode, ReverseIndex, select};
use crate::core::types::{BuildUnit, UnitInfo};
use crate::io::toolchain::Toolchain;

pub struct CascadeSelector<T> {
    toolchain: Arc<T>,
    mode: CascadeMode,
    input: Batches<BuildUnit>,
    out: BatchWriter<String>,
}

impl<T: Toolchain> CascadeSelector<T> {
    pub fn new(
        toolchain: Arc<T>,
        mode: CascadeMode,
        input: Batches<BuildUnit>,
        out: BatchWriter<String>,
    ) -> Self {
        Self {
            toolchain,
            mode,
            input,
            out,
        }
    }

    pub fn run(self) -> Result<()> {
        while let Some(batch) = self.input.next_batch() {
            let units: Vec<BuildUnit> = batch.collect();
            let selected = self.select_cycle(&units);
            info!(units = units.len(), selected = selected.len(), "selected units to test");
            self.out.send_all(selected)?;
        }
        Ok(())
    }

    /// Build this cycle's reverse index and pick the units to test.
    pub fn select_cycle(&self, units: &[BuildUnit]) -> BTreeSet<String> {
        let mut resolved: HashMap<String, Option<UnitInfo>> = HashMap::new();
        let mut index = ReverseIndex::new();
        for unit in units {
            index.add_unit(unit, |import| {
                resolved
                    .entry(import.to_string())
                    .or_insert_with(|| self.resolve_dependency(import))
                    .clone()
            });
        }
        select(units, &index, self.mode)
    }

    /// Resolve an import, dropping standard-library and unresolvable ones.
    fn resolve_dependency(&self, import: &str) -> Option<UnitInfo> {
        match self.toolchain.resolve_import(import) {
            Ok(info) if info.standard => None,
            Ok(info) => Some(info),
            Err(err) => {
                debug!(import, err = %format!("{err:#}"), "ignoring unresolvable import");
                None
            }
        }
    }
}
