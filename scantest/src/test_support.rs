//! Test-only helpers: file description builders and a scripted toolchain.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::core::types::{BuildUnit, FileDescription, UnitInfo};
use crate::io::toolchain::{Invocation, Toolchain};

/// Non-test Go source file.
pub fn source_file(path: &str, size: u64, modified: i64) -> FileDescription {
    FileDescription::new(path, false, size, modified)
}

/// Go test file. `path` must end in `_test.go`.
pub fn test_file(path: &str, size: u64, modified: i64) -> FileDescription {
    let file = FileDescription::new(path, false, size, modified);
    assert!(file.is_test, "{path} is not a test file name");
    file
}

pub fn dir(path: &str) -> FileDescription {
    FileDescription::new(path, true, 4096, 0)
}

/// Copy of `file` flagged as modified.
pub fn modified(mut file: FileDescription) -> FileDescription {
    file.is_modified = true;
    file
}

/// Package `import_path` living in `/w/<last path segment>`.
pub fn unit_info(import_path: &str, imports: &[&str], test_imports: &[&str]) -> UnitInfo {
    let name = import_path.rsplit('/').next().unwrap_or(import_path);
    UnitInfo {
        import_path: import_path.to_string(),
        dir: PathBuf::from(format!("/w/{name}")),
        imports: imports.iter().map(|s| s.to_string()).collect(),
        test_imports: test_imports.iter().map(|s| s.to_string()).collect(),
        standard: false,
    }
}

pub fn build_unit(info: UnitInfo, code_modified: bool, test_modified: bool) -> BuildUnit {
    BuildUnit {
        info,
        code_modified,
        test_modified,
    }
}

/// Temporary tree holding `files`, given as `(relative path, contents)`.
pub fn go_tree(files: &[(&str, &str)]) -> TempDir {
    let temp = tempfile::tempdir().expect("tempdir");
    for (relative, contents) in files {
        let path = temp.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write file");
    }
    temp
}

/// Toolchain answering from memory. Unscripted steps succeed.
#[derive(Debug, Default)]
pub struct ScriptedToolchain {
    units: Vec<UnitInfo>,
    standard: HashSet<String>,
    generate: HashMap<String, Invocation>,
    tests: HashMap<String, Invocation>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unit(mut self, info: UnitInfo) -> Self {
        self.units.push(info);
        self
    }

    /// Register a standard-library import path.
    pub fn with_standard(mut self, import_path: &str) -> Self {
        self.standard.insert(import_path.to_string());
        self
    }

    pub fn with_generate(mut self, unit: &str, invocation: Invocation) -> Self {
        self.generate.insert(unit.to_string(), invocation);
        self
    }

    pub fn with_test(mut self, unit: &str, invocation: Invocation) -> Self {
        self.tests.insert(unit.to_string(), invocation);
        self
    }

    /// Every `generate`/`test` call so far, as `"<step> <unit>"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl Toolchain for ScriptedToolchain {
    fn resolve_dir(&self, dir: &Path) -> Result<UnitInfo> {
        self.units
            .iter()
            .find(|info| info.dir == dir)
            .cloned()
            .ok_or_else(|| anyhow!("no Go files in {}", dir.display()))
    }

    fn resolve_import(&self, import_path: &str) -> Result<UnitInfo> {
        if self.standard.contains(import_path) {
            return Ok(UnitInfo {
                import_path: import_path.to_string(),
                standard: true,
                ..UnitInfo::default()
            });
        }
        self.units
            .iter()
            .find(|info| info.import_path == import_path)
            .cloned()
            .ok_or_else(|| anyhow!("cannot find package {import_path}"))
    }

    fn generate(&self, unit: &str) -> Result<Invocation> {
        self.record(format!("generate {unit}"));
        Ok(self
            .generate
            .get(unit)
            .cloned()
            .unwrap_or_else(|| Invocation::exited(0, "")))
    }

    fn test(&self, unit: &str) -> Result<Invocation> {
        self.record(format!("test {unit}"));
        Ok(self
            .tests
            .get(unit)
            .cloned()
            .unwrap_or_else(|| Invocation::exited(0, format!("ok  \t{unit}\t0.001s\n"))))
    }
}
