//! Continuous incremental test runner for Go packages.
//!
//! Watches the current directory, and after every edit re-runs `go test` for
//! the packages that changed plus their direct importers. Press Enter to force
//! a full re-run.

use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;

use scantest::exit_codes;
use scantest::io::config::{CONFIG_FILENAME, load_config};
use scantest::io::toolchain::GoToolchain;
use scantest::io::trigger::{self, Trigger, forward_enter_presses};
use scantest::logging;
use scantest::pipeline::{self, PipelineOptions};
use scantest::stages::printer::OutputMode;

#[derive(Parser)]
#[command(
    name = "scantest",
    version,
    about = "Re-run the tests of Go packages affected by each edit"
)]
struct Cli {
    /// Print one JSON object per cycle instead of the colored console report.
    #[arg(long, alias = "web")]
    json: bool,
}

impl Cli {
    fn mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Console
        }
    }
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::FATAL);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let root: PathBuf = std::env::current_dir().context("determine working directory")?;
    let config = load_config(&root.join(CONFIG_FILENAME))?;
    config.apply_color();

    let (trigger, listener) = trigger::channel();
    spawn_stdin_reader(trigger)?;

    let toolchain = GoToolchain::new(&root, &config);
    pipeline::run(
        PipelineOptions {
            root,
            config,
            mode: cli.mode(),
        },
        toolchain,
        listener,
        std::io::stdout(),
    )
}

fn spawn_stdin_reader(trigger: Trigger) -> Result<()> {
    thread::Builder::new()
        .name("scantest-stdin".to_string())
        .spawn(move || {
            if let Err(err) = forward_enter_presses(std::io::stdin(), &trigger) {
                warn!(err = %format!("{err:#}"), "manual trigger disabled");
            }
        })
        .context("spawn stdin reader")?;
    Ok(())
}
