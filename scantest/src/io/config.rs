//! Orchestrator configuration stored in `.scantest.toml` at the watched root.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::cascade::CascadeMode;

/// File name looked up at the root of the watched tree.
pub const CONFIG_FILENAME: &str = ".scantest.toml";

/// Orchestrator configuration (TOML).
///
/// Every field is optional in the file; missing fields take the defaults
/// below, so an absent file behaves like an empty one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScantestConfig {
    /// Pause between two walks of the tree, in milliseconds.
    pub scan_interval_ms: u64,

    /// Directory names pruned during the walk (version control metadata).
    pub ignored_dirs: Vec<String>,

    /// Output of the code-generation step; never treated as a source change.
    pub generated_filename: String,

    /// Go toolchain executable.
    pub go_command: String,

    pub cascade: CascadeMode,

    pub color: ColorMode,

    /// Kill `go generate`/`go test` after this many seconds. Unset waits forever.
    pub process_timeout_secs: Option<u64>,

    pub generate_check: GenerateCheck,
}

/// Whether the console report uses ANSI colors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Colors when stdout is a terminal (honours `NO_COLOR`/`CLICOLOR_FORCE`).
    #[default]
    Auto,
    Always,
    Never,
}

/// Packages importing `import` must run a generator that mentions `marker`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GenerateCheck {
    pub import: String,
    pub marker: String,
}

impl Default for GenerateCheck {
    fn default() -> Self {
        Self {
            import: "github.com/smartystreets/gunit".to_string(),
            marker: "gunit".to_string(),
        }
    }
}

impl Default for ScantestConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 250,
            ignored_dirs: vec![".git".to_string(), ".hg".to_string()],
            generated_filename: "generated_by_gunit_test.go".to_string(),
            go_command: "go".to_string(),
            cascade: CascadeMode::Direct,
            color: ColorMode::Auto,
            process_timeout_secs: None,
            generate_check: GenerateCheck::default(),
        }
    }
}

impl ScantestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scan_interval_ms == 0 {
            return Err(anyhow!("scan_interval_ms must be > 0"));
        }
        if self.go_command.trim().is_empty() {
            return Err(anyhow!("go_command must be non-empty"));
        }
        if self.process_timeout_secs == Some(0) {
            return Err(anyhow!("process_timeout_secs must be > 0 when set"));
        }
        if self.generate_check.import.trim().is_empty()
            || self.generate_check.marker.trim().is_empty()
        {
            return Err(anyhow!(
                "generate_check.import and generate_check.marker must be non-empty"
            ));
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn process_timeout(&self) -> Option<Duration> {
        self.process_timeout_secs.map(Duration::from_secs)
    }

    /// Apply the color preference to the process-wide `colored` switch.
    pub fn apply_color(&self) {
        match self.color {
            ColorMode::Auto => colored::control::unset_override(),
            ColorMode::Always => colored::control::set_override(true),
            ColorMode::Never => colored::control::set_override(false),
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ScantestConfig::default()`.
pub fn load_config(path: &Path) -> Result<ScantestConfig> {
    if !path.exists() {
        let cfg = ScantestConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ScantestConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}
