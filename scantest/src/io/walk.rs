//! One depth-first walk of the watched tree.

use std::fs::Metadata;
use std::path::Path;
use std::time::UNIX_EPOCH;

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::core::types::FileDescription;
use crate::io::config::ScantestConfig;

/// What the walk leaves out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkFilter {
    /// Directory names pruned without descending.
    pub ignored_dirs: Vec<String>,
    /// File name skipped wherever it appears.
    pub generated_filename: String,
}

impl WalkFilter {
    pub fn from_config(config: &ScantestConfig) -> Self {
        Self {
            ignored_dirs: config.ignored_dirs.clone(),
            generated_filename: config.generated_filename.clone(),
        }
    }

    fn admits(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_dir() {
            return !self.ignored_dirs.iter().any(|ignored| *ignored == name);
        }
        name != self.generated_filename
    }
}

/// Lazily describe every entry under `root`, root included, in lexical order.
///
/// Entries that cannot be read or stat-ed are skipped and the walk continues.
pub fn walk<'a>(
    root: &Path,
    filter: &'a WalkFilter,
) -> impl Iterator<Item = FileDescription> + use<'a> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| filter.admits(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => describe(&entry),
            Err(err) => {
                debug!(err = %err, "skipping unreadable entry");
                None
            }
        })
}

fn describe(entry: &DirEntry) -> Option<FileDescription> {
    match entry.metadata() {
        Ok(metadata) => Some(FileDescription::new(
            entry.path(),
            metadata.is_dir(),
            metadata.len(),
            modified_secs(&metadata),
        )),
        Err(err) => {
            debug!(path = %entry.path().display(), err = %err, "skipping entry without metadata");
            None
        }
    }
}

fn modified_secs(metadata: &Metadata) -> i64 {
    match metadata.modified() {
        Ok(time) => match time.duration_since(UNIX_EPOCH) {
            Ok(since) => since.as_secs() as i64,
            Err(before) => -(before.duration().as_secs() as i64),
        },
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn walk_prunes_metadata_dirs_and_generated_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::create_dir_all(root.join(".git/objects")).expect("git dir");
        fs::write(root.join(".git/objects/x.go"), "package x").expect("write");
        fs::create_dir_all(root.join("calc")).expect("calc dir");
        fs::write(root.join("calc/calc.go"), "package calc").expect("write");
        fs::write(root.join("calc/calc_test.go"), "package calc").expect("write");
        fs::write(root.join("calc/generated_by_gunit_test.go"), "package calc").expect("write");
        fs::write(root.join("README.md"), "# calc").expect("write");

        let filter = WalkFilter::from_config(&ScantestConfig::default());
        let files: Vec<FileDescription> = walk(root, &filter).collect();
        let paths: Vec<PathBuf> = files
            .iter()
            .map(|file| file.path.strip_prefix(root).expect("under root").to_path_buf())
            .collect();

        assert_eq!(
            paths,
            vec![
                PathBuf::from(""),
                PathBuf::from("README.md"),
                PathBuf::from("calc"),
                PathBuf::from("calc/calc.go"),
                PathBuf::from("calc/calc_test.go"),
            ]
        );
        let calc_test = &files[4];
        assert!(calc_test.is_relevant() && calc_test.is_test);
        assert_eq!(calc_test.size, "package calc".len() as u64);
        assert_eq!(calc_test.parent, root.join("calc"));
        assert!(files[2].is_dir);
    }

    #[test]
    fn missing_root_yields_nothing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let filter = WalkFilter::from_config(&ScantestConfig::default());
        assert_eq!(walk(&temp.path().join("gone"), &filter).count(), 0);
    }
}
