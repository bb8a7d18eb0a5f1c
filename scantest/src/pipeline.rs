//! Wiring of the six stages into one running pipeline.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{info, warn};

use crate::batch;
use crate::io::config::ScantestConfig;
use crate::io::toolchain::Toolchain;
use crate::io::trigger::TriggerListener;
use crate::io::walk::WalkFilter;
use crate::stages::detector::ChangeDetector;
use crate::stages::grouper::UnitGrouper;
use crate::stages::printer::{OutputMode, Printer};
use crate::stages::runner::TestRunner;
use crate::stages::scanner::Scanner;
use crate::stages::selector::CascadeSelector;

/// Everything needed to start the pipeline.
pub struct PipelineOptions {
    pub root: PathBuf,
    pub config: ScantestConfig,
    pub mode: OutputMode,
}

/// Spawn stages 1 to 5 on their own threads and run the printer on this one.
///
/// Runs until the printer fails (fatal) or every stage has stopped.
pub fn run<T, W>(
    options: PipelineOptions,
    toolchain: T,
    trigger: TriggerListener,
    writer: W,
) -> Result<()>
where
    T: Toolchain + Send + Sync + 'static,
    W: Write,
{
    let PipelineOptions { root, config, mode } = options;
    let toolchain = Arc::new(toolchain);

    let (scanned_tx, scanned_rx) = batch::channel();
    let (checked_tx, checked_rx) = batch::channel();
    let (units_tx, units_rx) = batch::channel();
    let (selected_tx, selected_rx) = batch::channel();
    let (results_tx, results_rx) = batch::channel();

    info!(root = %root.display(), cascade = ?config.cascade, "watching for changes");

    let scanner = Scanner::new(
        root,
        WalkFilter::from_config(&config),
        config.scan_interval(),
        scanned_tx,
    );
    let detector = ChangeDetector::new(trigger, scanned_rx, checked_tx);
    let grouper = UnitGrouper::new(Arc::clone(&toolchain), checked_rx, units_tx);
    let selector = CascadeSelector::new(
        Arc::clone(&toolchain),
        config.cascade,
        units_rx,
        selected_tx,
    );
    let runner = TestRunner::new(
        toolchain,
        config.generate_check.clone(),
        selected_rx,
        results_tx,
    );

    let handles = vec![
        spawn_stage("scanner", move || scanner.run())?,
        spawn_stage("detector", move || detector.run())?,
        spawn_stage("grouper", move || grouper.run())?,
        spawn_stage("selector", move || selector.run())?,
        spawn_stage("runner", move || runner.run())?,
    ];

    Printer::new(mode, results_rx, writer)
        .run()
        .context("printer stage")?;

    // Upstream stages may be parked on a rendezvous forever; only collect the
    // ones that already ended.
    for (name, handle) in handles {
        if !handle.is_finished() {
            continue;
        }
        let outcome = handle
            .join()
            .map_err(|_| anyhow!("{name} stage panicked"))
            .and_then(|result| result);
        if let Err(err) = outcome {
            warn!(stage = name, err = %format!("{err:#}"), "stage stopped");
        }
    }
    bail!("pipeline stopped: results stream closed")
}

type StageHandle = (&'static str, JoinHandle<Result<()>>);

fn spawn_stage<F>(name: &'static str, body: F) -> Result<StageHandle>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    let handle = thread::Builder::new()
        .name(format!("scantest-{name}"))
        .spawn(body)
        .with_context(|| format!("spawn {name} stage"))?;
    Ok((name, handle))
}
