//! Manual re-run requests read from stdin.

use std::io::{BufRead, BufReader, Read};
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, TrySendError, sync_channel};

use anyhow::{Context, Result};
use tracing::{debug, info};

/// Create a single-slot trigger pair.
pub fn channel() -> (Trigger, TriggerListener) {
    let (tx, rx) = sync_channel(1);
    (Trigger { tx }, TriggerListener { rx })
}

/// Fire-and-forget side. Firing never blocks.
#[derive(Debug, Clone)]
pub struct Trigger {
    tx: SyncSender<()>,
}

impl Trigger {
    /// Request a forced re-run. Returns `false` once the listener is gone.
    pub fn fire(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => true,
            Err(TrySendError::Disconnected(())) => false,
        }
    }
}

/// Polled once per cycle by the change detector.
#[derive(Debug)]
pub struct TriggerListener {
    rx: Receiver<()>,
}

impl TriggerListener {
    /// Consume any pending request.
    pub fn take(&self) -> bool {
        let mut fired = false;
        loop {
            match self.rx.try_recv() {
                Ok(()) => fired = true,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return fired,
            }
        }
    }
}

/// Fire `trigger` for every line feed read from `input`.
///
/// Returns at end of input or once nobody listens anymore.
pub fn forward_enter_presses<R: Read>(input: R, trigger: &Trigger) -> Result<()> {
    let mut reader = BufReader::new(input);
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line).context("read stdin")?;
        if n == 0 {
            debug!("stdin closed, manual trigger disabled");
            return Ok(());
        }
        if line.ends_with(b"\n") {
            info!("manual re-run requested");
            if !trigger.fire() {
                return Ok(());
            }
        }
    }
}
