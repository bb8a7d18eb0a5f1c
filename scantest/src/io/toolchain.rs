//! Toolchain abstraction for package resolution, code generation and tests.
//!
//! The [`Toolchain`] trait decouples the pipeline from the Go command. Tests use
//! a scripted toolchain that answers from memory without spawning processes.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::types::UnitInfo;
use crate::io::config::ScantestConfig;
use crate::io::process::run_combined;

/// Result of one generate or test invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Stdout and stderr, interleaved.
    pub output: String,
    /// `None` when the process died from a signal (including a timeout kill).
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl Invocation {
    pub fn exited(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            exit_code: Some(exit_code),
            timed_out: false,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Human-readable reason for a non-zero outcome.
    pub fn failure_reason(&self) -> String {
        match (self.timed_out, self.exit_code) {
            (true, _) => "process timed out and was killed".to_string(),
            (false, Some(code)) => format!("exit status {code}"),
            (false, None) => "terminated by signal".to_string(),
        }
    }
}

/// The external build system as seen by the pipeline.
pub trait Toolchain {
    /// Resolve a directory into the package it holds.
    fn resolve_dir(&self, dir: &Path) -> Result<UnitInfo>;
    /// Resolve an import path into its package.
    fn resolve_import(&self, import_path: &str) -> Result<UnitInfo>;
    /// Run the code-generation step for a package.
    fn generate(&self, unit: &str) -> Result<Invocation>;
    /// Run the verbose test step for a package.
    fn test(&self, unit: &str) -> Result<Invocation>;
}

/// Toolchain that shells out to `go`.
#[derive(Debug, Clone)]
pub struct GoToolchain {
    go: String,
    workdir: PathBuf,
    timeout: Option<Duration>,
}

impl GoToolchain {
    pub fn new(workdir: impl Into<PathBuf>, config: &ScantestConfig) -> Self {
        Self {
            go: config.go_command.clone(),
            workdir: workdir.into(),
            timeout: config.process_timeout(),
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.go);
        cmd.args(args).current_dir(&self.workdir);
        cmd
    }

    fn list(&self, target: &str) -> Result<UnitInfo> {
        let out = self
            .command(&["list", "-json", target])
            .output()
            .with_context(|| format!("spawn {} list", self.go))?;
        if !out.status.success() {
            return Err(anyhow!(
                "{} list {} failed: {}",
                self.go,
                target,
                String::from_utf8_lossy(&out.stderr).trim()
            ));
        }
        let stdout = String::from_utf8_lossy(&out.stdout);
        parse_go_list(&stdout).with_context(|| format!("parse {} list output for {target}", self.go))
    }

    fn invoke(&self, args: &[&str]) -> Result<Invocation> {
        let output = run_combined(self.command(args), self.timeout)
            .with_context(|| format!("run {} {}", self.go, args.join(" ")))?;
        Ok(Invocation {
            output: output.combined_text(),
            exit_code: output.status.code(),
            timed_out: output.timed_out,
        })
    }
}

impl Toolchain for GoToolchain {
    #[instrument(skip_all, fields(dir = %dir.display()))]
    fn resolve_dir(&self, dir: &Path) -> Result<UnitInfo> {
        self.list(&dir.to_string_lossy())
    }

    #[instrument(skip(self))]
    fn resolve_import(&self, import_path: &str) -> Result<UnitInfo> {
        self.list(import_path)
    }

    #[instrument(skip(self))]
    fn generate(&self, unit: &str) -> Result<Invocation> {
        let invocation = self.invoke(&["generate", "-x", unit])?;
        debug!(exit_code = ?invocation.exit_code, "go generate finished");
        Ok(invocation)
    }

    #[instrument(skip(self))]
    fn test(&self, unit: &str) -> Result<Invocation> {
        let invocation = self.invoke(&["test", "-v", unit])?;
        debug!(exit_code = ?invocation.exit_code, "go test finished");
        Ok(invocation)
    }
}

/// Subset of `go list -json` output the pipeline needs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GoListPackage {
    import_path: String,
    #[serde(default)]
    dir: PathBuf,
    #[serde(default)]
    imports: Vec<String>,
    #[serde(default)]
    test_imports: Vec<String>,
    #[serde(default)]
    x_test_imports: Vec<String>,
    #[serde(default)]
    standard: bool,
}

/// Parse one package object printed by `go list -json`.
pub fn parse_go_list(json: &str) -> Result<UnitInfo> {
    let pkg: GoListPackage = serde_json::from_str(json).context("decode go list json")?;
    let mut test_imports = pkg.test_imports;
    for import in pkg.x_test_imports {
        if !test_imports.contains(&import) {
            test_imports.push(import);
        }
    }
    Ok(UnitInfo {
        import_path: pkg.import_path,
        dir: pkg.dir,
        imports: pkg.imports,
        test_imports,
        standard: pkg.standard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_package_with_external_tests() {
        let json = r#"{
            "Dir": "/w/calc",
            "ImportPath": "example.com/calc",
            "Name": "calc",
            "Imports": ["example.com/num", "fmt"],
            "TestImports": ["testing"],
            "XTestImports": ["example.com/calc", "github.com/smartystreets/gunit", "testing"]
        }"#;

        let info = parse_go_list(json).expect("parse");
        assert_eq!(info.import_path, "example.com/calc");
        assert_eq!(info.dir, PathBuf::from("/w/calc"));
        assert_eq!(info.imports, vec!["example.com/num", "fmt"]);
        assert_eq!(
            info.test_imports,
            vec!["testing", "example.com/calc", "github.com/smartystreets/gunit"]
        );
        assert!(!info.standard);
    }

    #[test]
    fn parses_standard_library_package() {
        let json = r#"{"Dir": "/usr/lib/go/src/fmt", "ImportPath": "fmt", "Goroot": true, "Standard": true}"#;
        let info = parse_go_list(json).expect("parse");
        assert!(info.standard);
        assert!(info.imports.is_empty());
    }

    #[test]
    fn rejects_output_without_import_path() {
        assert!(parse_go_list(r#"{"Dir": "/w/empty"}"#).is_err());
    }

    #[test]
    fn failure_reason_names_the_cause() {
        assert_eq!(Invocation::exited(2, "").failure_reason(), "exit status 2");
        let killed = Invocation {
            output: String::new(),
            exit_code: None,
            timed_out: true,
        };
        assert!(!killed.success());
        assert_eq!(killed.failure_reason(), "process timed out and was killed");
    }
}
