//! Shared deterministic types for the pipeline stages.
//!
//! These types are the contracts between stages. They carry no handles to
//! external state and are rebuilt from scratch every cycle.

use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};

/// Suffix of files the orchestrator cares about.
pub const SOURCE_SUFFIX: &str = ".go";
/// Suffix of Go test files.
pub const TEST_SUFFIX: &str = "_test.go";

/// One filesystem entry observed during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescription {
    pub path: PathBuf,
    pub parent: PathBuf,
    pub is_dir: bool,
    pub size: u64,
    /// Last modification time in Unix seconds.
    pub modified: i64,
    pub is_source: bool,
    pub is_test: bool,
    /// Set by the change detector.
    pub is_modified: bool,
}

impl FileDescription {
    /// Describe `path` from its metadata fields. Relevance is derived from the name.
    pub fn new(path: impl Into<PathBuf>, is_dir: bool, size: u64, modified: i64) -> Self {
        let path = path.into();
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let name = path.to_string_lossy();
        let is_source = name.ends_with(SOURCE_SUFFIX);
        let is_test = name.ends_with(TEST_SUFFIX);
        Self {
            path,
            parent,
            is_dir,
            size,
            modified,
            is_source,
            is_test,
            is_modified: false,
        }
    }

    /// Regular Go source file (test or not).
    pub fn is_relevant(&self) -> bool {
        !self.is_dir && self.is_source
    }
}

/// A package as reported by the toolchain's resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitInfo {
    pub import_path: String,
    pub dir: PathBuf,
    pub imports: Vec<String>,
    /// In-package and external test imports.
    pub test_imports: Vec<String>,
    /// Part of the standard library.
    pub standard: bool,
}

impl UnitInfo {
    /// Production imports followed by test imports.
    pub fn all_imports(&self) -> impl Iterator<Item = &str> {
        self.imports
            .iter()
            .chain(self.test_imports.iter())
            .map(String::as_str)
    }
}

/// One compilable directory and what changed in it this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildUnit {
    pub info: UnitInfo,
    pub code_modified: bool,
    pub test_modified: bool,
}

impl BuildUnit {
    pub fn new(info: UnitInfo) -> Self {
        Self {
            info,
            code_modified: false,
            test_modified: false,
        }
    }

    pub fn is_modified(&self) -> bool {
        self.code_modified || self.test_modified
    }

    pub fn import_path(&self) -> &str {
        &self.info.import_path
    }
}

/// Outcome of testing one unit, ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    GenerateFailed = 0,
    CompileFailed = 1,
    TestsFailed = 2,
    TestsPassed = 3,
}

impl Status {
    /// Stable integer code used in the JSON payload.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::GenerateFailed => "generate failed",
            Status::CompileFailed => "compile failed",
            Status::TestsFailed => "tests failed",
            Status::TestsPassed => "tests passed",
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// One unit's execution outcome for a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestResult {
    pub package_name: String,
    pub status: Status,
    pub output: String,
    /// Per-test failure excerpts; only populated for [`Status::TestsFailed`].
    pub failures: Vec<String>,
}

impl TestResult {
    pub fn new(package_name: impl Into<String>, status: Status, output: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            status,
            output: output.into(),
            failures: Vec::new(),
        }
    }
}
