//! Helpers for running child processes and capturing their combined output.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// How long reader threads may keep draining pipes after a timeout kill.
const KILL_GRACE: Duration = Duration::from_millis(250);

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    /// Stdout and stderr interleaved line by line, in arrival order.
    pub combined: Vec<u8>,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn combined_text(&self) -> String {
        String::from_utf8_lossy(&self.combined).into_owned()
    }
}

/// Run a command to completion and capture stdout and stderr into one buffer.
///
/// Both pipes are drained concurrently so a chatty child never blocks on a
/// full pipe. With `timeout` unset the wait has no deadline; otherwise the
/// child runs in its own process group, the whole group is killed once the
/// deadline passes, and `timed_out` is set. Output a surviving descendant
/// writes after the kill is not waited for.
#[instrument(skip_all, fields(timeout_secs = timeout.map(|limit| limit.as_secs())))]
pub fn run_combined(mut cmd: Command, timeout: Option<Duration>) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if timeout.is_some() {
        isolate_process_group(&mut cmd);
    }

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let combined = Arc::new(Mutex::new(Vec::new()));
    let stdout_handle = {
        let sink = Arc::clone(&combined);
        thread::spawn(move || copy_lines(stdout, &sink))
    };
    let stderr_handle = {
        let sink = Arc::clone(&combined);
        thread::spawn(move || copy_lines(stderr, &sink))
    };

    let mut timed_out = false;
    let status = match timeout {
        None => child.wait().context("wait for command")?,
        Some(limit) => match child.wait_timeout(limit).context("wait for command")? {
            Some(status) => status,
            None => {
                warn!(timeout_secs = limit.as_secs(), "command timed out, killing");
                timed_out = true;
                kill_process_group(&mut child)?;
                child.wait().context("wait command after kill")?
            }
        },
    };

    let combined = if timed_out {
        let drained = join_within([stdout_handle, stderr_handle], KILL_GRACE);
        if !drained {
            warn!("descendant still holds output pipes, keeping partial output");
        }
        combined
            .lock()
            .map_err(|_| anyhow!("output buffer poisoned"))?
            .clone()
    } else {
        join_output(stdout_handle).context("join stdout")?;
        join_output(stderr_handle).context("join stderr")?;
        Arc::try_unwrap(combined)
            .map_err(|_| anyhow!("output buffer still shared"))?
            .into_inner()
            .map_err(|_| anyhow!("output buffer poisoned"))?
    };

    debug!(exit_code = ?status.code(), timed_out, bytes = combined.len(), "command finished");
    Ok(CommandOutput {
        status,
        combined,
        timed_out,
    })
}

#[cfg(unix)]
fn isolate_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn isolate_process_group(_cmd: &mut Command) {}

/// Kill the child and everything it spawned into its process group.
#[cfg(unix)]
fn kill_process_group(child: &mut Child) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let group = Pid::from_raw(child.id() as i32);
    match killpg(group, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(err) => {
            warn!(err = %err, "killpg failed, killing child only");
            child.kill().context("kill command")
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) -> Result<()> {
    child.kill().context("kill command")
}

/// Join reader threads that finish within `grace`; the rest are left detached.
///
/// Returns whether every reader finished.
fn join_within<const N: usize>(handles: [JoinHandle<Result<()>>; N], grace: Duration) -> bool {
    let deadline = Instant::now() + grace;
    while handles.iter().any(|handle| !handle.is_finished()) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    let mut drained = true;
    for handle in handles {
        if !handle.is_finished() {
            drained = false;
            continue;
        }
        if let Err(err) = join_output(handle) {
            debug!(err = %format!("{err:#}"), "output reader failed after kill");
        }
    }
    drained
}

fn join_output(handle: JoinHandle<Result<()>>) -> Result<()> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn copy_lines<R: Read>(reader: R, sink: &Mutex<Vec<u8>>) -> Result<()> {
    let mut reader = BufReader::new(reader);
    loop {
        let mut line = Vec::new();
        let n = reader.read_until(b'\n', &mut line).context("read output")?;
        if n == 0 {
            break;
        }
        sink.lock()
            .map_err(|_| anyhow!("output buffer poisoned"))?
            .extend_from_slice(&line);
    }
    Ok(())
}
