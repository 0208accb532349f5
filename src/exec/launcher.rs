// src/exec/launcher.rs

//! Process launcher and result collection.
//!
//! The launcher is the only place that creates child processes. A missing
//! executable is not an error to propagate: it finalizes the execution as
//! `Failed` with return code 127 (POSIX convention) so the monitor never
//! supervises a process handle that does not exist.

use std::io::ErrorKind;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::engine::stats::Stats;
use crate::exec::output::spawn_readers;
use crate::execution::{CommandRequest, Execution};
use crate::types::ExecutionState;

/// Exit code reported for a missing executable.
pub const EXIT_COMMAND_NOT_FOUND: i32 = 127;

/// Build the `tokio::process::Command` for a request. Shell requests go
/// through the platform shell; otherwise the argv is spawned directly.
fn build_command(request: &CommandRequest) -> Command {
    let mut cmd = if request.shell {
        let joined = request.display_command();
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(joined);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(joined);
            c
        }
    } else {
        let mut c = Command::new(&request.command[0]);
        c.args(&request.command[1..]);
        c
    };

    if let Some(ref dir) = request.working_dir {
        cmd.current_dir(dir);
    }
    for (key, value) in &request.env {
        cmd.env(key, value);
    }

    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    cmd
}

/// Launch the initial process for an execution.
///
/// Spawn failures never propagate: they finalize the execution as `Failed`
/// (return code 127 for a missing executable) and return normally.
pub(crate) fn launch(exec: &Arc<Execution>, stats: &Arc<Stats>) {
    info!(
        id = exec.id,
        cmd = %exec.request.display_command(),
        critical = exec.request.critical,
        "launching supervised process"
    );

    if let Err(err) = spawn_and_wire(exec, stats) {
        let not_found = err
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == ErrorKind::NotFound);

        {
            let mut inner = exec.lock();
            inner.state = ExecutionState::Failed;
            inner.end_time = Some(Instant::now());
            if not_found {
                inner.return_code = Some(EXIT_COMMAND_NOT_FOUND);
                inner.errors.push(format!(
                    "executable not found: {}",
                    exec.request.display_command()
                ));
            } else {
                inner.errors.push(format!("launch failed: {err:#}"));
            }
        }

        error!(
            id = exec.id,
            cmd = %exec.request.display_command(),
            not_found,
            error = %err,
            "launch failed"
        );
        stats.record_terminal(ExecutionState::Failed);
        exec.mark_finalized();
    }
}

/// Relaunch the same request for the restart recovery action. Unlike the
/// initial launch, a spawn failure here is returned to the recovery
/// controller, which records it as a failed action and moves on.
pub(crate) fn respawn(exec: &Arc<Execution>, stats: &Arc<Stats>) -> Result<()> {
    spawn_and_wire(exec, stats)
}

/// Spawn the child and wire up its reader and waiter tasks.
fn spawn_and_wire(exec: &Arc<Execution>, stats: &Arc<Stats>) -> Result<()> {
    let mut cmd = build_command(&exec.request);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning '{}'", exec.request.display_command()))?;

    let pid = child.id();
    let generation = exec.mark_running(pid, Instant::now());

    debug!(id = exec.id, pid, generation, "process spawned");

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let readers = spawn_readers(exec, generation, stdout, stderr);

    // The waiter owns the child handle. It records exit information and
    // finalizes unless a recovery sequence is in flight, in which case the
    // recovery controller finishes the job.
    let exec = Arc::clone(exec);
    let stats = Arc::clone(stats);
    tokio::spawn(async move {
        let status = child.wait().await;

        // Drain outstanding output before anyone reads the buffers.
        for handle in readers {
            let _ = handle.await;
        }

        let now = Instant::now();
        let should_finalize = {
            let mut inner = exec.lock();
            if inner.generation != generation {
                debug!(
                    id = exec.id,
                    generation, "stale waiter for a replaced process; ignoring exit"
                );
                return;
            }

            inner.exited = true;
            inner.pid = None;
            inner.end_time = Some(now);
            match status {
                Ok(status) => {
                    inner.return_code = Some(status.code().unwrap_or(-1));
                }
                Err(ref e) => {
                    inner.return_code = Some(-1);
                    inner.errors.push(format!("waiting for process failed: {e}"));
                }
            }
            !inner.recovering && !inner.finalized
        };

        exec.notify_exit();

        if should_finalize {
            finalize(&exec, &stats);
        }
    });

    Ok(())
}

/// Finalize an execution whose process has exited: settle the terminal
/// state, count it exactly once, and wake the caller.
///
/// - `Running` resolves from the exit code (0 → `Completed`, else `Failed`).
/// - Detector-assigned `Stalled`/`Timeout` are preserved unless a recovery
///   action succeeded, in which case the execution ends `Recovered`.
pub(crate) fn finalize(exec: &Arc<Execution>, stats: &Arc<Stats>) {
    let final_state = {
        let mut inner = exec.lock();
        if inner.finalized {
            return;
        }

        let state = match inner.state {
            ExecutionState::Pending | ExecutionState::Running => {
                if inner.return_code == Some(0) {
                    ExecutionState::Completed
                } else {
                    ExecutionState::Failed
                }
            }
            ExecutionState::Stalled | ExecutionState::Timeout => {
                if inner.recovered {
                    ExecutionState::Recovered
                } else {
                    inner.state
                }
            }
            terminal => terminal,
        };
        inner.state = state;
        state
    };

    match final_state {
        ExecutionState::Completed | ExecutionState::Recovered => {
            info!(id = exec.id, state = %final_state, "execution finished");
        }
        _ => {
            warn!(id = exec.id, state = %final_state, "execution finished");
        }
    }

    stats.record_terminal(final_state);
    exec.mark_finalized();
}
