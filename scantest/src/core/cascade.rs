//! Reverse-dependency index and test selection.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::types::{BuildUnit, UnitInfo};

/// How far a production change propagates through importers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CascadeMode {
    /// Only units that import the changed unit directly.
    #[default]
    Direct,
    /// Every unit that reaches the changed unit through any chain of imports.
    Transitive,
}

/// Importee to importers, rebuilt every cycle.
#[derive(Debug, Default)]
pub struct ReverseIndex {
    importers: BTreeMap<String, BTreeSet<String>>,
}

impl ReverseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `importer` imports `imported`. Repeated edges collapse.
    pub fn add_edge(&mut self, imported: &str, importer: &str) {
        self.importers
            .entry(imported.to_string())
            .or_default()
            .insert(importer.to_string());
    }

    /// Index every import of `unit` that `resolve` accepts.
    ///
    /// `resolve` returns `None` for imports that are unresolvable or belong to
    /// the standard library; those never produce edges.
    pub fn add_unit<F>(&mut self, unit: &BuildUnit, mut resolve: F)
    where
        F: FnMut(&str) -> Option<UnitInfo>,
    {
        for import in unit.info.all_imports() {
            if let Some(imported) = resolve(import) {
                self.add_edge(&imported.import_path, unit.import_path());
            }
        }
    }

    pub fn importers_of(&self, import_path: &str) -> impl Iterator<Item = &str> {
        self.importers
            .get(import_path)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }
}

/// Compute the identities to test this cycle.
///
/// Every modified unit is selected. A unit whose production code changed also
/// selects its importers: one hop for [`CascadeMode::Direct`], the full
/// reverse closure for [`CascadeMode::Transitive`]. Test-only changes never
/// cascade.
pub fn select(units: &[BuildUnit], index: &ReverseIndex, mode: CascadeMode) -> BTreeSet<String> {
    let mut selected = BTreeSet::new();
    for unit in units.iter().filter(|unit| unit.is_modified()) {
        selected.insert(unit.import_path().to_string());
        if !unit.code_modified {
            continue;
        }
        match mode {
            CascadeMode::Direct => {
                selected.extend(index.importers_of(unit.import_path()).map(str::to_string));
            }
            CascadeMode::Transitive => {
                let mut pending = vec![unit.import_path().to_string()];
                let mut visited = BTreeSet::new();
                while let Some(current) = pending.pop() {
                    if !visited.insert(current.clone()) {
                        continue;
                    }
                    for importer in index.importers_of(&current) {
                        selected.insert(importer.to_string());
                        pending.push(importer.to_string());
                    }
                }
            }
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{build_unit, unit_info};

    fn index_for(units: &[BuildUnit]) -> ReverseIndex {
        let known: BTreeMap<String, UnitInfo> = units
            .iter()
            .map(|unit| (unit.import_path().to_string(), unit.info.clone()))
            .collect();
        let mut index = ReverseIndex::new();
        for unit in units {
            index.add_unit(unit, |import| known.get(import).cloned());
        }
        index
    }

    fn ids(selected: &BTreeSet<String>) -> Vec<&str> {
        selected.iter().map(String::as_str).collect()
    }

    #[test]
    fn production_change_cascades_to_importers() {
        let units = vec![
            build_unit(unit_info("a", &[], &[]), true, false),
            build_unit(unit_info("b", &["a"], &[]), false, false),
        ];
        let selected = select(&units, &index_for(&units), CascadeMode::Direct);
        assert_eq!(ids(&selected), vec!["a", "b"]);
    }

    #[test]
    fn test_only_change_does_not_cascade() {
        let units = vec![
            build_unit(unit_info("a", &[], &[]), false, true),
            build_unit(unit_info("b", &["a"], &[]), false, false),
        ];
        let selected = select(&units, &index_for(&units), CascadeMode::Direct);
        assert_eq!(ids(&selected), vec!["a"]);
    }

    #[test]
    fn test_imports_create_edges() {
        let units = vec![
            build_unit(unit_info("a", &[], &[]), true, false),
            build_unit(unit_info("b", &[], &["a"]), false, false),
        ];
        let selected = select(&units, &index_for(&units), CascadeMode::Direct);
        assert_eq!(ids(&selected), vec!["a", "b"]);
    }

    #[test]
    fn direct_mode_stops_after_one_hop() {
        let units = vec![
            build_unit(unit_info("a", &[], &[]), true, false),
            build_unit(unit_info("b", &["a"], &[]), false, false),
            build_unit(unit_info("c", &["b"], &[]), false, false),
        ];
        let index = index_for(&units);
        assert_eq!(ids(&select(&units, &index, CascadeMode::Direct)), vec!["a", "b"]);
        assert_eq!(
            ids(&select(&units, &index, CascadeMode::Transitive)),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn transitive_mode_survives_import_cycles() {
        let units = vec![
            build_unit(unit_info("a", &["b"], &[]), true, false),
            build_unit(unit_info("b", &[], &["a"]), false, false),
        ];
        let selected = select(&units, &index_for(&units), CascadeMode::Transitive);
        assert_eq!(ids(&selected), vec!["a", "b"]);
    }

    #[test]
    fn unresolved_imports_and_duplicates_add_no_edges() {
        let units = vec![build_unit(
            unit_info("b", &["fmt", "a", "a"], &["a"]),
            false,
            false,
        )];
        let mut index = ReverseIndex::new();
        index.add_unit(&units[0], |import| {
            (import == "a").then(|| unit_info("a", &[], &[]))
        });

        assert_eq!(index.importers_of("a").collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(index.importers_of("fmt").count(), 0);
    }

    #[test]
    fn nothing_modified_selects_nothing() {
        let units = vec![build_unit(unit_info("a", &[], &[]), false, false)];
        assert!(select(&units, &index_for(&units), CascadeMode::Direct).is_empty());
    }
}
