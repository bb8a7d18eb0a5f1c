//! Checksum-based change detection across cycles.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::core::types::FileDescription;

/// Cheap per-file fingerprint: size plus modification time.
///
/// Not a content hash. Editors that rewrite a file always move its mtime.
pub fn checksum(file: &FileDescription) -> i64 {
    (file.size as i64).wrapping_add(file.modified)
}

/// Checksums retained from the most recently processed cycle.
#[derive(Debug, Default)]
pub struct ChangeState {
    checksums: HashMap<PathBuf, i64>,
    total: i64,
}

impl ChangeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of relevant files seen in the last processed cycle.
    pub fn tracked(&self) -> usize {
        self.checksums.len()
    }

    /// Process one cycle of file descriptions.
    ///
    /// Returns every relevant file, each flagged when new, changed, or when
    /// `reset` is set, but only if the summed checksum moved or `reset` is set.
    /// `None` means nothing relevant changed and the cycle should be dropped.
    pub fn observe<I>(&mut self, files: I, reset: bool) -> Option<Vec<FileDescription>>
    where
        I: IntoIterator<Item = FileDescription>,
    {
        let mut total = 0i64;
        let mut checksums = HashMap::new();
        let mut relevant = Vec::new();

        for mut file in files {
            if !file.is_relevant() {
                continue;
            }
            let sum = checksum(&file);
            total = total.wrapping_add(sum);
            file.is_modified = reset || self.checksums.get(&file.path) != Some(&sum);
            checksums.insert(file.path.clone(), sum);
            relevant.push(file);
        }
        self.checksums = checksums;

        if total == self.total && !reset {
            return None;
        }
        self.total = total;
        Some(relevant)
    }
}
