//! Aggregation of flagged files into build units.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use crate::core::types::{BuildUnit, FileDescription, UnitInfo};

/// Group files by parent directory, resolving each directory once.
///
/// Directories whose resolution fails (e.g. a blank `.go` file without a
/// package clause) are skipped for this cycle. Units come back in directory
/// order.
pub fn group_units<I, F>(files: I, mut resolve: F) -> Vec<BuildUnit>
where
    I: IntoIterator<Item = FileDescription>,
    F: FnMut(&Path) -> Result<UnitInfo>,
{
    let mut units: BTreeMap<PathBuf, BuildUnit> = BTreeMap::new();
    let mut unresolved: BTreeSet<PathBuf> = BTreeSet::new();

    for file in files {
        if unresolved.contains(&file.parent) {
            continue;
        }
        let unit = match units.entry(file.parent.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => match resolve(&file.parent) {
                Ok(info) => entry.insert(BuildUnit::new(info)),
                Err(err) => {
                    debug!(dir = %file.parent.display(), err = %format!("{err:#}"), "skipping unresolvable directory");
                    unresolved.insert(file.parent);
                    continue;
                }
            },
        };
        mark(unit, &file);
    }

    units.into_values().collect()
}

fn mark(unit: &mut BuildUnit, file: &FileDescription) {
    if !file.is_modified {
        return;
    }
    if file.is_test {
        unit.test_modified = true;
    } else if file.is_source {
        unit.code_modified = true;
    }
}
